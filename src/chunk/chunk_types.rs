//! Chunk type constants

/// Creates a chunk type identifier
macro_rules! chunk_type {
    (
        $(#[$doc:meta])*
        $const_name:ident, $a:expr_2021, $b:expr_2021, $c:expr_2021, $d:expr_2021
    ) => {
        $(#[$doc])*
        pub const $const_name: [char; 4] = [$a, $b, $c, $d];
    };
}

chunk_type!(
    /// Header chunk, always the first chunk of a file
    HEADER_CHUNK, 'M', 'T', 'h', 'd'
);
chunk_type!(
    /// Track data chunk
    TRACK_DATA_CHUNK, 'M', 'T', 'r', 'k'
);
