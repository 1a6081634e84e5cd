pub mod release_dates;
