mod message;
pub use message::{MessageReceiver, Messages};
