pub mod contractmodel;
pub mod disputemodel;
pub mod notificationmodel;
pub mod paymentmodel;
pub mod usermodel;
