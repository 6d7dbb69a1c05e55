pub mod model_harness;
