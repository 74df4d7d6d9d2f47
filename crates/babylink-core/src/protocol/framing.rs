//! Network-list framing shared by the radio and socket transports.

use crate::domain::network::NetworkList;

/// Separator between fields of every pipe-delimited payload.
pub const FIELD_DELIMITER: char = '|';

/// Splits a radio report (`name1|name2|...`) into a de-duplicated list.
///
/// Names are kept verbatim; only empty segments are dropped.
pub fn split_pipe_list(text: &str) -> NetworkList {
    text.split(FIELD_DELIMITER).collect()
}

/// Splits a socket report (one name per line) into a de-duplicated list.
///
/// Lines are trimmed, so `\r\n` line endings and stray spaces are tolerated.
pub fn split_line_list(text: &str) -> NetworkList {
    text.lines().map(str::trim).collect()
}
