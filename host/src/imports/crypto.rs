//! `ext_crypto_*` imports.
//!
//! Key generation inserts into the keystore addressed by the 4-byte key
//! type id read directly at the supplied pointer. An optional seed is a
//! SCALE `Option<bytes>` holding a BIP-39 phrase. While the signature
//! batcher is started, every verify import queues its signature and
//! reports success; `ext_crypto_finish_batch_verify_version_1` collects
//! the aggregate verdict.

use anyhow::anyhow;
use wasmtime::{Caller, Linker};

use filament_primitives::codec::decode_option_bytes;
use filament_primitives::crypto::{ecdsa, ed25519, sr25519, KeyType, Pair, SignatureInfo};
use filament_primitives::hashing::blake2_256;
use filament_primitives::KeyTypeId;

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{host_try, memory_of, MODULE};

/// SCALE encoding of an empty public-key vector, the sentinel for
/// `public_keys` failures.
const EMPTY_KEY_LIST: &[u8] = &[0x00];

fn encode_key_list(keys: &[Vec<u8>]) -> Vec<u8> {
    use codec::{Compact, Encode};
    let mut out = Compact(keys.len() as u32).encode();
    for key in keys {
        out.extend_from_slice(key);
    }
    out
}

/// Decode the optional seed span into a BIP-39 phrase, if present.
fn decode_seed_phrase(seed_bytes: &[u8]) -> Result<Option<String>, String> {
    let seed = decode_option_bytes(seed_bytes).map_err(|e| e.to_string())?;
    match seed {
        None => Ok(None),
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| "seed phrase is not valid UTF-8".to_string()),
    }
}

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    register_ed25519(linker)?;
    register_sr25519(linker)?;
    register_ecdsa(linker)?;
    register_batch_verify(linker)?;
    Ok(())
}

fn register_ed25519(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_crypto_ed25519_generate_version_1",
        |mut caller: Caller<'_, HostContext>, key_type_ptr: i32, seed_span: i64| -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let id: KeyTypeId = host_try!(
                mem::read_array(&memory, &caller, key_type_ptr as u32),
                0,
                "ext_crypto_ed25519_generate: reading key type id"
            );
            let seed_bytes = host_try!(
                mem::read_span(&memory, &caller, seed_span.into()),
                0,
                "ext_crypto_ed25519_generate: reading seed"
            );

            let pair = match decode_seed_phrase(&seed_bytes) {
                Ok(Some(phrase)) => match ed25519::Pair::from_phrase(&phrase) {
                    Ok(pair) => pair,
                    Err(err) => {
                        log::warn!(target: "host", "cannot generate ed25519 key: {err}");
                        return 0;
                    }
                },
                Ok(None) => ed25519::Pair::generate(),
                Err(err) => {
                    log::warn!(target: "host", "cannot generate ed25519 key: {err}");
                    return 0;
                }
            };

            let keystore = caller.data().keystore.keystore(id);
            if let Err(err) = keystore.insert(Pair::Ed25519(pair.clone())) {
                log::warn!(target: "host", "failed to insert ed25519 key: {err}");
                return 0;
            }

            let ptr = host_try!(
                mem::write_sized(&memory, &mut caller, &pair.public()),
                0,
                "ext_crypto_ed25519_generate: writing public key"
            );
            log::debug!(
                target: "host",
                "generated ed25519 keypair with public key 0x{}",
                hex::encode(pair.public())
            );
            ptr as i32
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_ed25519_public_keys_version_1",
        |mut caller: Caller<'_, HostContext>, key_type_ptr: i32| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let id: KeyTypeId = host_try!(
                mem::read_array(&memory, &caller, key_type_ptr as u32),
                0,
                "ext_crypto_ed25519_public_keys: reading key type id"
            );

            let keystore = caller.data().keystore.keystore(id);
            if !matches!(keystore.key_type(), KeyType::Ed25519 | KeyType::Unknown) {
                log::warn!(
                    target: "host",
                    "keystore type for id 0x{} is {} and not the expected ed25519",
                    hex::encode(id),
                    keystore.key_type()
                );
                let out = host_try!(
                    mem::write_owned(&memory, &mut caller, EMPTY_KEY_LIST),
                    0,
                    "ext_crypto_ed25519_public_keys: writing sentinel"
                );
                return out.as_i64();
            }

            let keys = keystore.public_keys_of(KeyType::Ed25519);
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &encode_key_list(&keys)),
                0,
                "ext_crypto_ed25519_public_keys: writing keys"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_ed25519_sign_version_1",
        |mut caller: Caller<'_, HostContext>,
         key_type_ptr: i32,
         public_key_ptr: i32,
         message_span: i64|
         -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let id: KeyTypeId = host_try!(
                mem::read_array(&memory, &caller, key_type_ptr as u32),
                0,
                "ext_crypto_ed25519_sign: reading key type id"
            );
            let public: [u8; 32] = host_try!(
                mem::read_array(&memory, &caller, public_key_ptr as u32),
                0,
                "ext_crypto_ed25519_sign: reading public key"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                0,
                "ext_crypto_ed25519_sign: reading message"
            );

            let keystore = caller.data().keystore.keystore(id);
            let signature = match keystore.keypair(&public) {
                Some(pair) => Some(pair.sign(&message)),
                None => {
                    log::error!(
                        target: "host",
                        "could not find public key 0x{} in keystore",
                        hex::encode(public)
                    );
                    None
                }
            };

            let out = host_try!(
                mem::write_option_fixed(&memory, &mut caller, signature.as_deref()),
                0,
                "ext_crypto_ed25519_sign: writing signature"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_ed25519_verify_version_1",
        |mut caller: Caller<'_, HostContext>,
         signature_ptr: i32,
         message_span: i64,
         public_key_ptr: i32|
         -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let signature: [u8; 64] = host_try!(
                mem::read_array(&memory, &caller, signature_ptr as u32),
                0,
                "ext_crypto_ed25519_verify: reading signature"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                0,
                "ext_crypto_ed25519_verify: reading message"
            );
            let public: [u8; 32] = host_try!(
                mem::read_array(&memory, &caller, public_key_ptr as u32),
                0,
                "ext_crypto_ed25519_verify: reading public key"
            );

            if caller.data().sig_verifier.is_started() {
                caller.data().sig_verifier.add(SignatureInfo {
                    public_key: public.to_vec(),
                    signature: signature.to_vec(),
                    message,
                    verify: ed25519::verify,
                });
                return 1;
            }

            if ed25519::verify(&signature, &message, &public) {
                log::debug!(target: "host", "verified ed25519 signature");
                1
            } else {
                log::error!(target: "host", "failed to validate ed25519 signature");
                0
            }
        },
    )?;

    Ok(())
}

fn register_sr25519(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_crypto_sr25519_generate_version_1",
        |mut caller: Caller<'_, HostContext>,
         key_type_ptr: i32,
         seed_span: i64|
         -> anyhow::Result<i32> {
            let Some(memory) = memory_of(&mut caller) else {
                return Ok(0);
            };
            let id: KeyTypeId = host_try!(
                mem::read_array(&memory, &caller, key_type_ptr as u32),
                Ok(0),
                "ext_crypto_sr25519_generate: reading key type id"
            );
            let seed_bytes = host_try!(
                mem::read_span(&memory, &caller, seed_span.into()),
                Ok(0),
                "ext_crypto_sr25519_generate: reading seed"
            );

            // A malformed option envelope is recoverable; a bad phrase is
            // an unrecoverable invariant violation and traps the instance.
            let pair = match decode_seed_phrase(&seed_bytes) {
                Ok(Some(phrase)) => sr25519::Pair::from_phrase(&phrase)
                    .map_err(|err| anyhow!("sr25519 keypair generation failed: {err}"))?,
                Ok(None) => sr25519::Pair::generate(),
                Err(err) => {
                    log::warn!(target: "host", "cannot generate sr25519 key: {err}");
                    return Ok(0);
                }
            };

            let keystore = caller.data().keystore.keystore(id);
            if let Err(err) = keystore.insert(Pair::Sr25519(pair.clone())) {
                log::warn!(target: "host", "failed to insert sr25519 key: {err}");
                return Ok(0);
            }

            let ptr = host_try!(
                mem::write_sized(&memory, &mut caller, &pair.public()),
                Ok(0),
                "ext_crypto_sr25519_generate: writing public key"
            );
            log::debug!(
                target: "host",
                "generated sr25519 keypair with public key 0x{}",
                hex::encode(pair.public())
            );
            Ok(ptr as i32)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_sr25519_public_keys_version_1",
        |mut caller: Caller<'_, HostContext>, key_type_ptr: i32| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let id: KeyTypeId = host_try!(
                mem::read_array(&memory, &caller, key_type_ptr as u32),
                0,
                "ext_crypto_sr25519_public_keys: reading key type id"
            );

            let keystore = caller.data().keystore.keystore(id);
            if !matches!(keystore.key_type(), KeyType::Sr25519 | KeyType::Unknown) {
                log::warn!(
                    target: "host",
                    "keystore type for id 0x{} is {} and not the expected sr25519",
                    hex::encode(id),
                    keystore.key_type()
                );
                let out = host_try!(
                    mem::write_owned(&memory, &mut caller, EMPTY_KEY_LIST),
                    0,
                    "ext_crypto_sr25519_public_keys: writing sentinel"
                );
                return out.as_i64();
            }

            let keys = keystore.public_keys_of(KeyType::Sr25519);
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &encode_key_list(&keys)),
                0,
                "ext_crypto_sr25519_public_keys: writing keys"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_sr25519_sign_version_1",
        |mut caller: Caller<'_, HostContext>,
         key_type_ptr: i32,
         public_key_ptr: i32,
         message_span: i64|
         -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let id: KeyTypeId = host_try!(
                mem::read_array(&memory, &caller, key_type_ptr as u32),
                0,
                "ext_crypto_sr25519_sign: reading key type id"
            );
            let public: [u8; 32] = host_try!(
                mem::read_array(&memory, &caller, public_key_ptr as u32),
                0,
                "ext_crypto_sr25519_sign: reading public key"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                0,
                "ext_crypto_sr25519_sign: reading message"
            );

            let keystore = caller.data().keystore.keystore(id);
            let signature = match keystore.keypair(&public) {
                Some(pair) => Some(pair.sign(&message)),
                None => {
                    log::error!(
                        target: "host",
                        "could not find public key 0x{} in keystore",
                        hex::encode(public)
                    );
                    None
                }
            };

            let out = host_try!(
                mem::write_option_fixed(&memory, &mut caller, signature.as_deref()),
                0,
                "ext_crypto_sr25519_sign: writing signature"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_sr25519_verify_version_1",
        |mut caller: Caller<'_, HostContext>,
         signature_ptr: i32,
         message_span: i64,
         public_key_ptr: i32|
         -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let signature: [u8; 64] = host_try!(
                mem::read_array(&memory, &caller, signature_ptr as u32),
                0,
                "ext_crypto_sr25519_verify: reading signature"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                0,
                "ext_crypto_sr25519_verify: reading message"
            );
            let public: [u8; 32] = host_try!(
                mem::read_array(&memory, &caller, public_key_ptr as u32),
                0,
                "ext_crypto_sr25519_verify: reading public key"
            );

            if caller.data().sig_verifier.is_started() {
                caller.data().sig_verifier.add(SignatureInfo {
                    public_key: public.to_vec(),
                    signature: signature.to_vec(),
                    message,
                    verify: sr25519::verify,
                });
                return 1;
            }

            if sr25519::verify_deprecated(&signature, &message, &public) {
                log::debug!(target: "host", "verified sr25519 signature");
            } else {
                // A known historical block carries invalid sr25519
                // signatures; this version reports success regardless.
                log::debug!(target: "host", "failed to validate sr25519 signature");
            }
            1
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_sr25519_verify_version_2",
        |mut caller: Caller<'_, HostContext>,
         signature_ptr: i32,
         message_span: i64,
         public_key_ptr: i32|
         -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let signature: [u8; 64] = host_try!(
                mem::read_array(&memory, &caller, signature_ptr as u32),
                0,
                "ext_crypto_sr25519_verify_v2: reading signature"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                0,
                "ext_crypto_sr25519_verify_v2: reading message"
            );
            let public: [u8; 32] = host_try!(
                mem::read_array(&memory, &caller, public_key_ptr as u32),
                0,
                "ext_crypto_sr25519_verify_v2: reading public key"
            );

            if caller.data().sig_verifier.is_started() {
                caller.data().sig_verifier.add(SignatureInfo {
                    public_key: public.to_vec(),
                    signature: signature.to_vec(),
                    message,
                    verify: sr25519::verify,
                });
                return 1;
            }

            if sr25519::verify(&signature, &message, &public) {
                log::debug!(target: "host", "validated sr25519 signature");
                1
            } else {
                log::error!(target: "host", "failed to validate sr25519 signature");
                0
            }
        },
    )?;

    Ok(())
}

fn register_ecdsa(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    fn recover_uncompressed(
        caller: &mut Caller<'_, HostContext>,
        signature_ptr: i32,
        message_ptr: i32,
        what: &'static str,
    ) -> i64 {
        let Some(memory) = memory_of(caller) else {
            return 0;
        };
        // The message is the 32-byte hash of the signed payload; the
        // signature carries the recovery id as its final byte.
        let signature: [u8; 65] = host_try!(
            mem::read_array(&memory, caller, signature_ptr as u32),
            0,
            what
        );
        let message: [u8; 32] =
            host_try!(mem::read_array(&memory, caller, message_ptr as u32), 0, what);

        let envelope = match ecdsa::recover(&signature, &message) {
            Ok(public) => {
                log::debug!(
                    target: "host",
                    "recovered public key 0x{}",
                    hex::encode(public)
                );
                Ok(public.to_vec())
            }
            Err(err) => {
                log::error!(target: "host", "failed to recover public key: {err}");
                Err(())
            }
        };
        let out = host_try!(
            mem::write_result(
                &memory,
                caller,
                envelope.as_ref().map(|v| v.as_slice()).map_err(|_| &[][..])
            ),
            0,
            what
        );
        out.as_i64()
    }

    fn recover_compressed(
        caller: &mut Caller<'_, HostContext>,
        signature_ptr: i32,
        message_ptr: i32,
        what: &'static str,
    ) -> i64 {
        let Some(memory) = memory_of(caller) else {
            return 0;
        };
        let signature: [u8; 65] = host_try!(
            mem::read_array(&memory, caller, signature_ptr as u32),
            0,
            what
        );
        let message: [u8; 32] =
            host_try!(mem::read_array(&memory, caller, message_ptr as u32), 0, what);

        let envelope = match ecdsa::recover_compressed(&signature, &message) {
            Ok(public) => Ok(public.to_vec()),
            Err(err) => {
                log::error!(target: "host", "failed to recover public key: {err}");
                Err(())
            }
        };
        let out = host_try!(
            mem::write_result(
                &memory,
                caller,
                envelope.as_ref().map(|v| v.as_slice()).map_err(|_| &[][..])
            ),
            0,
            what
        );
        out.as_i64()
    }

    linker.func_wrap(
        MODULE,
        "ext_crypto_secp256k1_ecdsa_recover_version_1",
        |mut caller: Caller<'_, HostContext>, signature_ptr: i32, message_ptr: i32| -> i64 {
            recover_uncompressed(
                &mut caller,
                signature_ptr,
                message_ptr,
                "ext_crypto_secp256k1_ecdsa_recover",
            )
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_crypto_secp256k1_ecdsa_recover_version_2",
        |mut caller: Caller<'_, HostContext>, signature_ptr: i32, message_ptr: i32| -> i64 {
            recover_uncompressed(
                &mut caller,
                signature_ptr,
                message_ptr,
                "ext_crypto_secp256k1_ecdsa_recover_v2",
            )
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_crypto_secp256k1_ecdsa_recover_compressed_version_1",
        |mut caller: Caller<'_, HostContext>, signature_ptr: i32, message_ptr: i32| -> i64 {
            recover_compressed(
                &mut caller,
                signature_ptr,
                message_ptr,
                "ext_crypto_secp256k1_ecdsa_recover_compressed",
            )
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_crypto_secp256k1_ecdsa_recover_compressed_version_2",
        |mut caller: Caller<'_, HostContext>, signature_ptr: i32, message_ptr: i32| -> i64 {
            recover_compressed(
                &mut caller,
                signature_ptr,
                message_ptr,
                "ext_crypto_secp256k1_ecdsa_recover_compressed_v2",
            )
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_ecdsa_verify_version_2",
        |mut caller: Caller<'_, HostContext>,
         signature_ptr: i32,
         message_span: i64,
         public_key_ptr: i32|
         -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let signature: [u8; 64] = host_try!(
                mem::read_array(&memory, &caller, signature_ptr as u32),
                0,
                "ext_crypto_ecdsa_verify: reading signature"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                0,
                "ext_crypto_ecdsa_verify: reading message"
            );
            let public: [u8; 33] = host_try!(
                mem::read_array(&memory, &caller, public_key_ptr as u32),
                0,
                "ext_crypto_ecdsa_verify: reading public key"
            );

            let hash = blake2_256(&message);

            if caller.data().sig_verifier.is_started() {
                caller.data().sig_verifier.add(SignatureInfo {
                    public_key: public.to_vec(),
                    signature: signature.to_vec(),
                    message: hash.to_vec(),
                    verify: ecdsa::verify,
                });
                return 1;
            }

            if ecdsa::verify(&signature, &hash, &public) {
                log::debug!(target: "host", "validated ecdsa signature");
                1
            } else {
                log::error!(target: "host", "failed to validate ecdsa signature");
                0
            }
        },
    )?;

    Ok(())
}

fn register_batch_verify(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_crypto_start_batch_verify_version_1",
        |caller: Caller<'_, HostContext>| {
            caller.data().sig_verifier.start();
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_crypto_finish_batch_verify_version_1",
        |caller: Caller<'_, HostContext>| -> i32 {
            if caller.data().sig_verifier.finish() {
                1
            } else {
                log::error!(target: "host", "batch signature verification failed");
                0
            }
        },
    )?;

    Ok(())
}
