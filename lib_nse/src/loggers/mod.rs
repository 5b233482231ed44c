/// Defines the data structures for log records.
pub mod logrecord;
/// Implements a local logger with support for TTY, file and `log` facade output.
pub mod loggerlocal;
