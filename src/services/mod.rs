pub mod geocoder;
pub mod mailer;
pub mod token;
