pub mod single_or_array;
