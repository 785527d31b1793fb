pub mod random_date;
pub mod schedule;
