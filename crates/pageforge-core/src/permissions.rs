//! Permission flags and encryption policy
//!
//! Maps the user-facing permission booleans onto the revision 3 `/P` bit
//! layout of the standard security handler. Bit positions follow the
//! format specification (1-based): print 3, modify 4, copy 5, annotate 6,
//! fill forms 9, accessibility extraction 10, assemble 11, high-resolution
//! print 12. Reserved bits 7-8 and 13-32 stay set, bits 1-2 stay clear.

use serde::{Deserialize, Serialize};

/// What an encrypted document permits when opened with the user password.
/// The owner password always grants full access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Permissions {
    /// Print the document (high-resolution; deny clears both print bits)
    pub print: bool,
    /// Modify contents
    pub modify: bool,
    /// Copy or extract text and graphics
    pub copy: bool,
    /// Add or modify annotations
    pub annotate: bool,
    /// Fill in form fields
    pub fill_forms: bool,
    /// Extract text for accessibility purposes
    pub accessibility: bool,
    /// Insert, rotate or delete pages
    pub assemble: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            print: true,
            modify: true,
            copy: true,
            annotate: true,
            fill_forms: true,
            accessibility: true,
            assemble: true,
        }
    }
}

/// Passwords and permissions for `set_encryption`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionPolicy {
    /// Owner password, must be non-empty
    pub owner_password: String,
    /// User password; empty means the document opens without one
    #[serde(default)]
    pub user_password: String,
    /// Permissions granted under the user password
    #[serde(default)]
    pub permissions: Permissions,
}

const PRINT: u32 = 1 << 2;
const MODIFY: u32 = 1 << 3;
const COPY: u32 = 1 << 4;
const ANNOTATE: u32 = 1 << 5;
const FILL_FORMS: u32 = 1 << 8;
const ACCESSIBILITY: u32 = 1 << 9;
const ASSEMBLE: u32 = 1 << 10;
const PRINT_HIGH_RES: u32 = 1 << 11;

/// Encode permissions as the signed 32-bit `/P` value.
pub fn encode_permissions(permissions: &Permissions) -> i64 {
    // Start from everything-allowed (-4) and clear what is denied
    let mut bits: u32 = 0xFFFF_FFFC;
    if !permissions.print {
        bits &= !(PRINT | PRINT_HIGH_RES);
    }
    if !permissions.modify {
        bits &= !MODIFY;
    }
    if !permissions.copy {
        bits &= !COPY;
    }
    if !permissions.annotate {
        bits &= !ANNOTATE;
    }
    if !permissions.fill_forms {
        bits &= !FILL_FORMS;
    }
    if !permissions.accessibility {
        bits &= !ACCESSIBILITY;
    }
    if !permissions.assemble {
        bits &= !ASSEMBLE;
    }
    bits as i32 as i64
}

/// Recover the permission booleans from a `/P` value.
pub fn decode_permissions(p: i64) -> Permissions {
    let bits = p as u32;
    Permissions {
        print: bits & PRINT != 0 && bits & PRINT_HIGH_RES != 0,
        modify: bits & MODIFY != 0,
        copy: bits & COPY != 0,
        annotate: bits & ANNOTATE != 0,
        fill_forms: bits & FILL_FORMS != 0,
        accessibility: bits & ACCESSIBILITY != 0,
        assemble: bits & ASSEMBLE != 0,
    }
}
