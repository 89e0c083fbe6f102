// cube-rig: choreographed rotations for a three-brick cube manipulator
//
// The host compiles every face turn into a small direct-command program
// that the brick VM executes on its own, including the busy-wait that
// releases the next turn early ("corner cutting"). The modules below
// split into the brick link (`ev3`), the choreography (`motion`) and
// the interface to the external solver (`solver`).

pub mod config;
pub mod ev3;
pub mod motion;
pub mod solver;
