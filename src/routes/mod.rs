pub mod bookings;
pub mod buyer;
pub mod coupons;
pub mod creator;
pub mod orders;
pub mod payments;
