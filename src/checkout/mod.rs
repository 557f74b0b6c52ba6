pub mod controller;
pub mod state;

pub use controller::CheckoutController;
pub use state::{CheckoutOutcome, CheckoutState, CheckoutStatus};
