#[cfg(feature = "read")]
#[doc(inline)]
pub use read::*;

#[cfg(feature = "read")]
#[doc(hidden)]
mod read {}
