//! Wire vocabulary, argument accessors and the streaming command decoder.

pub(crate) mod args;
pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod style;
pub(crate) mod table;
