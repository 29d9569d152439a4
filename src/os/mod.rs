pub mod darwin;
