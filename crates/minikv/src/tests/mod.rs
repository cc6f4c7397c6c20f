mod helpers;

mod atomic_tests;
mod batch_tests;
mod write_tests;
