//! Integration tests for the shipyard CLI

mod helpers;

mod test_gate;
mod test_init;
mod test_plan;
mod test_publish;
mod test_run;
mod test_sweep;
