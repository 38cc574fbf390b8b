mod mutex;
mod sequence;
mod sid;
mod status;
#[cfg(test)]
mod tests;

pub(crate) use mutex::*;
pub use sequence::*;
pub use sid::*;
pub use status::*;
