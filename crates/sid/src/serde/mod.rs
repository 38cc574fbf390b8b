mod sid;

pub use sid::*;
