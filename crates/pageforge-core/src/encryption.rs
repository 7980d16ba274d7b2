//! Standard security handler
//!
//! Password protection via the standard security handler, V=2 R=3 (RC4,
//! 128-bit keys). Encryption derives the `/O` and `/U` verification values
//! and a file key from the passwords, then encrypts every string and
//! stream with a per-object key. Decryption authenticates the supplied
//! password against `/U` (user) or `/O` (owner), walks the objects in
//! reverse, and drops the encryption dictionary.
//!
//! Revision 2 files (40-bit keys) are accepted for decryption only.

use crate::error::PageForgeError;
use crate::permissions::{encode_permissions, PermissionPolicy};
use crate::rc4::rc4_apply;
use crate::save_document;
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};

/// Password padding string from the standard security handler
const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// Key length in bytes for files we write (128-bit)
const KEY_LENGTH: usize = 16;

/// Pad or truncate a password to exactly 32 bytes.
fn pad_password(password: &str) -> [u8; 32] {
    let bytes = password.as_bytes();
    let n = bytes.len().min(32);
    let mut padded = [0u8; 32];
    padded[..n].copy_from_slice(&bytes[..n]);
    padded[n..].copy_from_slice(&PAD[..32 - n]);
    padded
}

/// RC4 key derived from the owner password, used to produce and to undo
/// the `/O` value.
fn owner_key(owner_padded: &[u8; 32], revision: i64, key_length: usize) -> Vec<u8> {
    let mut hash = Md5::digest(owner_padded).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    hash.truncate(key_length);
    hash
}

/// The `/O` entry: the padded user password encrypted under the owner key.
fn compute_o(
    owner_padded: &[u8; 32],
    user_padded: &[u8; 32],
    revision: i64,
    key_length: usize,
) -> [u8; 32] {
    let key = owner_key(owner_padded, revision, key_length);
    let mut value = rc4_apply(&key, user_padded);
    if revision >= 3 {
        for i in 1..=19u8 {
            let pass_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            value = rc4_apply(&pass_key, &value);
        }
    }
    let mut o = [0u8; 32];
    o.copy_from_slice(&value);
    o
}

/// The file encryption key from the user password and document facts.
fn file_key(
    user_padded: &[u8; 32],
    o: &[u8],
    p: i64,
    file_id: &[u8],
    revision: i64,
    key_length: usize,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(user_padded);
    hasher.update(o);
    hasher.update((p as i32).to_le_bytes());
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_length]).to_vec();
        }
    }
    hash.truncate(key_length);
    hash
}

/// The `/U` entry used to verify the user password.
fn compute_u(key: &[u8], file_id: &[u8], revision: i64) -> [u8; 32] {
    let mut u = [0u8; 32];
    if revision >= 3 {
        let mut hasher = Md5::new();
        hasher.update(PAD);
        hasher.update(file_id);
        let hash = hasher.finalize();
        let mut value = rc4_apply(key, &hash);
        for i in 1..=19u8 {
            let pass_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            value = rc4_apply(&pass_key, &value);
        }
        u[..16].copy_from_slice(&value);
    } else {
        u.copy_from_slice(&rc4_apply(key, &PAD));
    }
    u
}

/// Whether a candidate file key reproduces the stored `/U` value.
/// Revision 3 compares only the first 16 bytes.
fn key_authenticates(key: &[u8], stored_u: &[u8], file_id: &[u8], revision: i64) -> bool {
    let computed = compute_u(key, file_id, revision);
    if revision >= 3 {
        computed[..16] == stored_u[..16]
    } else {
        computed[..] == stored_u[..32]
    }
}

/// Per-object RC4 key: MD5 of the file key, the low 3 bytes of the object
/// number and the low 2 bytes of the generation number.
fn object_key(key: &[u8], id: ObjectId) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(key);
    hasher.update(&id.0.to_le_bytes()[..3]);
    hasher.update(&id.1.to_le_bytes()[..2]);
    let hash = hasher.finalize();
    let n = (key.len() + 5).min(16);
    hash[..n].to_vec()
}

/// Encrypt or decrypt every string and stream reachable from an object.
/// Strings switch to hexadecimal form so ciphertext never has to be
/// escaped inside literal delimiters.
fn crypt_object(obj: &mut Object, key: &[u8]) {
    match obj {
        Object::String(bytes, format) => {
            *bytes = rc4_apply(key, bytes);
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(arr) => {
            for item in arr {
                crypt_object(item, key);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                crypt_object(value, key);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                crypt_object(value, key);
            }
            stream.content = rc4_apply(key, &stream.content);
        }
        _ => {}
    }
}

/// Encrypt a document under the standard security handler.
///
/// The owner password must be non-empty; an empty user password leaves
/// the document openable by anyone, constrained by the permission flags.
pub fn set_encryption(bytes: &[u8], policy: &PermissionPolicy) -> Result<Vec<u8>, PageForgeError> {
    if policy.owner_password.is_empty() {
        return Err(PageForgeError::PolicyError(
            "Owner password must not be empty".to_string(),
        ));
    }

    let mut doc =
        Document::load_mem(bytes).map_err(|e| PageForgeError::ParseError(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PageForgeError::AlreadyEncrypted);
    }

    let revision = 3i64;
    let p = encode_permissions(&policy.permissions);
    let file_id: [u8; 16] = Md5::digest(bytes).into();

    let owner_padded = pad_password(&policy.owner_password);
    let user_padded = pad_password(&policy.user_password);
    let o = compute_o(&owner_padded, &user_padded, revision, KEY_LENGTH);
    let key = file_key(&user_padded, &o, p, &file_id, revision, KEY_LENGTH);
    let u = compute_u(&key, &file_id, revision);

    for (&id, object) in doc.objects.iter_mut() {
        crypt_object(object, &object_key(&key, id));
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => revision,
        "Length" => (KEY_LENGTH * 8) as i64,
        "P" => p,
        "O" => Object::String(o.to_vec(), StringFormat::Hexadecimal),
        "U" => Object::String(u.to_vec(), StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.to_vec(), StringFormat::Hexadecimal),
            Object::String(file_id.to_vec(), StringFormat::Hexadecimal),
        ]),
    );

    tracing::info!(
        has_user_password = !policy.user_password.is_empty(),
        "encrypted document"
    );
    save_document(&mut doc)
}

/// Decrypt a document and drop its encryption dictionary.
///
/// The password is tried as the user password first, then as the owner
/// password. An empty string covers documents locked only by permissions.
pub fn remove_password(bytes: &[u8], password: &str) -> Result<Vec<u8>, PageForgeError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| PageForgeError::ParseError(e.to_string()))?;

    let encrypt_ref = match doc.trailer.get(b"Encrypt") {
        Ok(obj) => obj.as_reference().ok(),
        Err(_) => return Err(PageForgeError::NotEncrypted),
    };
    let encrypt_dict = match encrypt_ref {
        Some(id) => doc
            .get_dictionary(id)
            .map_err(|e| {
                PageForgeError::OperationError(format!("Bad encryption dictionary: {}", e))
            })?
            .clone(),
        None => doc
            .trailer
            .get(b"Encrypt")
            .and_then(Object::as_dict)
            .map_err(|e| {
                PageForgeError::OperationError(format!("Bad encryption dictionary: {}", e))
            })?
            .clone(),
    };

    let standard = encrypt_dict
        .get(b"Filter")
        .and_then(Object::as_name)
        .map(|name| name == b"Standard")
        .unwrap_or(false);
    let version = encrypt_dict.get(b"V").and_then(Object::as_i64).unwrap_or(1);
    let revision = encrypt_dict.get(b"R").and_then(Object::as_i64).unwrap_or(2);
    if !standard || !(1..=2).contains(&version) || !(2..=3).contains(&revision) {
        return Err(PageForgeError::OperationError(format!(
            "Unsupported encryption (V={}, R={}); only standard RC4 revisions 2 and 3 are supported",
            version, revision
        )));
    }
    let key_length = match encrypt_dict.get(b"Length").and_then(Object::as_i64) {
        Ok(bits) if (40..=128).contains(&bits) && bits % 8 == 0 => (bits / 8) as usize,
        _ => 5,
    };

    let o: [u8; 32] = encrypt_dict
        .get(b"O")
        .and_then(Object::as_str)
        .ok()
        .and_then(|s| s.to_vec().try_into().ok())
        .ok_or_else(|| {
            PageForgeError::OperationError("Malformed /O in encryption dictionary".to_string())
        })?;
    let u = encrypt_dict
        .get(b"U")
        .and_then(Object::as_str)
        .map_err(|_| {
            PageForgeError::OperationError("Malformed /U in encryption dictionary".to_string())
        })?
        .to_vec();
    if u.len() < 32 {
        return Err(PageForgeError::OperationError(
            "Malformed /U in encryption dictionary".to_string(),
        ));
    }
    let p = encrypt_dict
        .get(b"P")
        .and_then(Object::as_i64)
        .map_err(|_| {
            PageForgeError::OperationError("Missing /P in encryption dictionary".to_string())
        })?;
    let file_id: Vec<u8> = doc
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .ok()
        .and_then(|arr| arr.first())
        .and_then(|obj| obj.as_str().ok())
        .map(|s| s.to_vec())
        .unwrap_or_default();

    // Try the password as the user password
    let padded = pad_password(password);
    let user_key = file_key(&padded, &o, p, &file_id, revision, key_length);
    let key = if key_authenticates(&user_key, &u, &file_id, revision) {
        user_key
    } else {
        // Try it as the owner password: undo /O to recover the padded
        // user password, then derive the file key from that
        let okey = owner_key(&padded, revision, key_length);
        let mut value = o.to_vec();
        if revision >= 3 {
            for i in (0..=19u8).rev() {
                let pass_key: Vec<u8> = okey.iter().map(|b| b ^ i).collect();
                value = rc4_apply(&pass_key, &value);
            }
        } else {
            value = rc4_apply(&okey, &value);
        }
        let mut recovered = [0u8; 32];
        recovered.copy_from_slice(&value[..32]);
        let owner_derived_key = file_key(&recovered, &o, p, &file_id, revision, key_length);
        if !key_authenticates(&owner_derived_key, &u, &file_id, revision) {
            return Err(PageForgeError::WrongPassword);
        }
        owner_derived_key
    };

    for (&id, object) in doc.objects.iter_mut() {
        // Leave the encryption dictionary itself alone, its values are plaintext
        if Some(id) == encrypt_ref {
            continue;
        }
        crypt_object(object, &object_key(&key, id));
    }

    doc.trailer.remove(b"Encrypt");
    doc.prune_objects();
    tracing::info!("removed document encryption");
    save_document(&mut doc)
}
