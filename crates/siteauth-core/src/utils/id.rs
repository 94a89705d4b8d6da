// Record id generation.
//
// Ids are an entity tag plus a lowercase base-36 body, e.g. `user_k3v9...`.
// The body comes from nanoid, which draws from the OS random source.

const BASE36: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of the random body. 24 base-36 characters is roughly 124 bits.
pub const ID_BODY_LENGTH: usize = 24;

/// Generate a tagged id, e.g. `generate_id("user")`.
pub fn generate_id(tag: &str) -> String {
    format!("{tag}_{}", generate_id_body(ID_BODY_LENGTH))
}

/// Generate an untagged base-36 string of the given length.
pub fn generate_id_body(len: usize) -> String {
    nanoid::nanoid!(len, &BASE36)
}
