mod decision;
mod marker;
mod memory;
mod post;

pub use decision::ReplyDecision;
pub use marker::LastCheckedMarker;
pub use memory::InteractionMemory;
pub use post::{Post, Thread};

#[cfg(test)]
pub use post::test_support;
