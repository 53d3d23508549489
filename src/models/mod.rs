pub mod booking;
pub mod calendar;
pub mod payment;
pub mod report;
pub mod review;

pub use booking::{
    Booking, BookingFilter, BookingStatus, BookingUpdate, NewBooking, TransitionPolicy,
};
pub use calendar::{CalendarMonth, DateWindow};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use report::{
    BookingReport, BookingStatusBucket, GroupTotal, PaymentReport, PaymentStatusBucket,
    RatingBucket, ReviewReport,
};
pub use review::{NewReview, Review};
