pub mod contractdb;
pub mod db;
pub mod disputedb;
pub mod notificationdb;
pub mod paymentdb;
pub mod userdb;
