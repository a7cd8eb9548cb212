//! Voice datagram encryption for the Sotto client.
//!
//! Implements the OCB2-AES128 construction the Mumble UDP channel uses: each
//! datagram is `[nonce byte | 3-byte tag | ciphertext]`, so ciphertext is
//! exactly four bytes longer than plaintext. The one-byte rolling nonce
//! doubles as a sequence number, which is what drives the good/late/lost
//! accounting both sides exchange in control-channel pings.
//!
//! [`CryptState::decrypt`] never fails loudly: a datagram that does not
//! authenticate, replays a nonce, or falls outside the late window simply
//! returns `None` and is counted. Crypto resync is a control-channel
//! concern and lives with the caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use aes::Aes128;
use aes::cipher::KeyInit;
use thiserror::Error;

mod ocb;

use ocb::{ocb_decrypt, ocb_encrypt};

/// AES block and key size; also the nonce size.
pub const BLOCK_SIZE: usize = 16;

/// Bytes of overhead added to every encrypted datagram.
pub const TAG_OVERHEAD: usize = 4;

/// How far behind the current nonce a late datagram may arrive and still be
/// accepted.
const LATE_WINDOW: i32 = 30;

/// Errors from key material installation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Key or nonce had the wrong length.
    #[error("expected {expected} bytes of key material, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Provided length.
        actual: usize,
    },
}

/// Snapshot of the cipher's packet accounting.
///
/// `local_*` counts what this client observed decrypting server traffic;
/// `remote_*` mirrors the server's view as reported in its pings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CryptStats {
    /// Datagrams decrypted in order or within the late window.
    pub local_good: u32,
    /// Datagrams that arrived behind the current nonce.
    pub local_late: u32,
    /// Datagrams presumed lost from nonce gaps.
    pub local_lost: u32,
    /// Nonce resyncs performed.
    pub local_resync: u32,
    /// Server-reported good count.
    pub remote_good: u32,
    /// Server-reported late count.
    pub remote_late: u32,
    /// Server-reported lost count.
    pub remote_lost: u32,
    /// Server-reported resync count.
    pub remote_resync: u32,
}

/// OCB2-AES128 cipher state for one connection.
pub struct CryptState {
    cipher: Option<Aes128>,
    encrypt_iv: [u8; BLOCK_SIZE],
    decrypt_iv: [u8; BLOCK_SIZE],
    decrypt_history: [u8; 256],
    stats: CryptStats,
}

impl Default for CryptState {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptState {
    /// Create an uninitialized cipher; [`CryptState::encrypt`] and
    /// [`CryptState::decrypt`] refuse to work until keys are installed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cipher: None,
            encrypt_iv: [0; BLOCK_SIZE],
            decrypt_iv: [0; BLOCK_SIZE],
            decrypt_history: [0; 256],
            stats: CryptStats::default(),
        }
    }

    /// True once key material has been installed.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.cipher.is_some()
    }

    /// Current packet accounting.
    #[must_use]
    pub fn stats(&self) -> CryptStats {
        self.stats
    }

    /// Record the server's view of the channel from a control ping.
    pub fn set_remote(&mut self, good: u32, late: u32, lost: u32, resync: u32) {
        self.stats.remote_good = good;
        self.stats.remote_late = late;
        self.stats.remote_lost = lost;
        self.stats.remote_resync = resync;
    }

    /// Install key material from the server's crypt setup.
    ///
    /// `client_nonce` seeds the encrypt IV, `server_nonce` the decrypt IV.
    /// Replaces any previous state, including counters and replay history.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidLength`] when any input is not [`BLOCK_SIZE`]
    /// bytes; existing state is left untouched.
    pub fn install(
        &mut self,
        key: &[u8],
        client_nonce: &[u8],
        server_nonce: &[u8],
    ) -> Result<(), KeyError> {
        for material in [key, client_nonce, server_nonce] {
            if material.len() != BLOCK_SIZE {
                return Err(KeyError::InvalidLength {
                    expected: BLOCK_SIZE,
                    actual: material.len(),
                });
            }
        }

        self.cipher = Some(Aes128::new_from_slice(key).expect("length checked above"));
        self.encrypt_iv.copy_from_slice(client_nonce);
        self.decrypt_iv.copy_from_slice(server_nonce);
        self.decrypt_history = [0; 256];
        self.stats = CryptStats::default();

        Ok(())
    }

    /// Install a fresh decrypt nonce from a resync reply.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidLength`] when the nonce is not [`BLOCK_SIZE`]
    /// bytes.
    pub fn set_decrypt_nonce(&mut self, server_nonce: &[u8]) -> Result<(), KeyError> {
        if server_nonce.len() != BLOCK_SIZE {
            return Err(KeyError::InvalidLength {
                expected: BLOCK_SIZE,
                actual: server_nonce.len(),
            });
        }

        self.decrypt_iv.copy_from_slice(server_nonce);
        self.stats.local_resync = self.stats.local_resync.wrapping_add(1);
        Ok(())
    }

    /// Encrypt a plaintext datagram.
    ///
    /// The result is `plain.len() + 4` bytes: the rolling nonce byte, three
    /// tag bytes, then the ciphertext. Returns `None` before keys are
    /// installed.
    pub fn encrypt(&mut self, plain: &[u8]) -> Option<Vec<u8>> {
        let cipher = self.cipher.as_ref()?;

        // Advance the full-width nonce; byte zero is what travels.
        for byte in &mut self.encrypt_iv {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }

        let mut out = vec![0u8; plain.len() + TAG_OVERHEAD];
        let tag = ocb_encrypt(cipher, plain, &mut out[TAG_OVERHEAD..], &self.encrypt_iv);

        out[0] = self.encrypt_iv[0];
        out[1..TAG_OVERHEAD].copy_from_slice(&tag[..3]);
        Some(out)
    }

    /// Decrypt a received datagram.
    ///
    /// Applies the rolling-nonce window rules: in-order packets advance the
    /// nonce, packets up to [`LATE_WINDOW`] behind are accepted once (replays
    /// are dropped via per-nonce history), and gaps are counted as losses.
    /// Returns `None` — with counters updated but the nonce restored — on
    /// any authentication or window failure.
    pub fn decrypt(&mut self, source: &[u8]) -> Option<Vec<u8>> {
        let cipher = self.cipher.as_ref()?;
        if source.len() < TAG_OVERHEAD {
            return None;
        }

        let ivbyte = source[0];
        let saved_iv = self.decrypt_iv;
        let mut late = 0u32;
        let mut lost = 0i32;
        let mut restore = false;

        if self.decrypt_iv[0].wrapping_add(1) == ivbyte {
            // In order as expected.
            if ivbyte > self.decrypt_iv[0] {
                self.decrypt_iv[0] = ivbyte;
            } else {
                // Wrapped: carry into the high bytes.
                self.decrypt_iv[0] = ivbyte;
                carry_increment(&mut self.decrypt_iv[1..]);
            }
        } else {
            // Out of order or repeat.
            let diff = wrapped_diff(ivbyte, self.decrypt_iv[0]);

            if ivbyte < self.decrypt_iv[0] && diff > -LATE_WINDOW && diff < 0 {
                // Late packet, no wraparound.
                late = 1;
                lost = -1;
                self.decrypt_iv[0] = ivbyte;
                restore = true;
            } else if ivbyte > self.decrypt_iv[0] && diff > -LATE_WINDOW && diff < 0 {
                // Late packet from the previous nonce cycle.
                late = 1;
                lost = -1;
                self.decrypt_iv[0] = ivbyte;
                carry_decrement(&mut self.decrypt_iv[1..]);
                restore = true;
            } else if ivbyte > self.decrypt_iv[0] && diff > 0 {
                // A gap ahead of us; the skipped nonces are losses.
                lost = i32::from(ivbyte) - i32::from(self.decrypt_iv[0]) - 1;
                self.decrypt_iv[0] = ivbyte;
            } else if ivbyte < self.decrypt_iv[0] && diff > 0 {
                // A gap that also wrapped the nonce byte.
                lost = 255 - i32::from(self.decrypt_iv[0]) + i32::from(ivbyte);
                self.decrypt_iv[0] = ivbyte;
                carry_increment(&mut self.decrypt_iv[1..]);
            } else {
                return None;
            }

            if self.decrypt_history[usize::from(self.decrypt_iv[0])] == self.decrypt_iv[1] {
                self.decrypt_iv = saved_iv;
                return None;
            }
        }

        let mut plain = vec![0u8; source.len() - TAG_OVERHEAD];
        let tag = ocb_decrypt(cipher, &source[TAG_OVERHEAD..], &mut plain, &self.decrypt_iv);

        if tag[..3] != source[1..TAG_OVERHEAD] {
            self.decrypt_iv = saved_iv;
            return None;
        }

        self.decrypt_history[usize::from(self.decrypt_iv[0])] = self.decrypt_iv[1];

        if restore {
            self.decrypt_iv = saved_iv;
        }

        self.stats.local_good = self.stats.local_good.wrapping_add(1);
        self.stats.local_late = self.stats.local_late.wrapping_add(late);
        self.stats.local_lost = self.stats.local_lost.wrapping_add_signed(lost);

        Some(plain)
    }
}

/// Propagate a +1 carry through the high nonce bytes.
fn carry_increment(bytes: &mut [u8]) {
    for byte in bytes {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

/// Propagate a -1 borrow through the high nonce bytes.
fn carry_decrement(bytes: &mut [u8]) {
    for byte in bytes {
        let original = *byte;
        *byte = byte.wrapping_sub(1);
        if original != 0 {
            break;
        }
    }
}

/// Signed distance between two nonce bytes on the wrapping u8 circle.
fn wrapped_diff(a: u8, b: u8) -> i32 {
    let mut diff = i32::from(a) - i32::from(b);
    if diff > 128 {
        diff -= 256;
    } else if diff < -128 {
        diff += 256;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: [u8; 16] = [0x11; 16];
    const CLIENT_NONCE: [u8; 16] = [0x22; 16];
    const SERVER_NONCE: [u8; 16] = [0x33; 16];

    /// A matched pair of states, as server and client would hold them.
    fn linked_pair() -> (CryptState, CryptState) {
        let mut alice = CryptState::new();
        alice.install(&KEY, &CLIENT_NONCE, &SERVER_NONCE).unwrap();

        let mut bob = CryptState::new();
        // The peer's encrypt nonce is our decrypt nonce and vice versa.
        bob.install(&KEY, &SERVER_NONCE, &CLIENT_NONCE).unwrap();

        (alice, bob)
    }

    #[test]
    fn uninitialized_refuses_work() {
        let mut state = CryptState::new();
        assert!(!state.initialized());
        assert!(state.encrypt(b"voice").is_none());
        assert!(state.decrypt(&[0u8; 32]).is_none());
    }

    #[test]
    fn install_rejects_short_key() {
        let mut state = CryptState::new();
        let err = state.install(&[0u8; 8], &CLIENT_NONCE, &SERVER_NONCE).unwrap_err();
        assert_eq!(err, KeyError::InvalidLength { expected: 16, actual: 8 });
        assert!(!state.initialized());
    }

    #[test]
    fn round_trip_counts_good() {
        let (mut alice, mut bob) = linked_pair();

        for i in 0u8..10 {
            let plain = vec![i; 64];
            let wire = alice.encrypt(&plain).unwrap();
            assert_eq!(wire.len(), plain.len() + TAG_OVERHEAD);
            assert_eq!(bob.decrypt(&wire).unwrap(), plain);
        }

        let stats = bob.stats();
        assert_eq!(stats.local_good, 10);
        assert_eq!(stats.local_late, 0);
        assert_eq!(stats.local_lost, 0);
    }

    #[test]
    fn tampered_tag_is_rejected_and_nonce_restored() {
        let (mut alice, mut bob) = linked_pair();

        let mut wire = alice.encrypt(b"attack at dawn").unwrap();
        wire[2] ^= 0x01;
        assert!(bob.decrypt(&wire).is_none());
        assert_eq!(bob.stats().local_good, 0);

        // The nonce was restored, so the next genuine datagram reads as a
        // gap of one and still decrypts.
        let wire = alice.encrypt(b"attack at dawn").unwrap();
        assert!(bob.decrypt(&wire).is_some());
        assert_eq!(bob.stats().local_lost, 1);
    }

    #[test]
    fn replayed_datagram_is_dropped() {
        let (mut alice, mut bob) = linked_pair();

        let first = alice.encrypt(b"one").unwrap();
        let second = alice.encrypt(b"two").unwrap();
        assert!(bob.decrypt(&first).is_some());
        assert!(bob.decrypt(&second).is_some());

        // Replaying the first datagram is late AND already in history.
        assert!(bob.decrypt(&first).is_none());
        assert_eq!(bob.stats().local_good, 2);
    }

    #[test]
    fn late_packet_accepted_once_and_counted() {
        let (mut alice, mut bob) = linked_pair();

        let first = alice.encrypt(b"first").unwrap();
        let second = alice.encrypt(b"second").unwrap();

        // Second arrives before first: one loss recorded, then repaired.
        assert!(bob.decrypt(&second).is_some());
        assert_eq!(bob.stats().local_lost, 1);

        assert!(bob.decrypt(&first).is_some());
        let stats = bob.stats();
        assert_eq!(stats.local_good, 2);
        assert_eq!(stats.local_late, 1);
        assert_eq!(stats.local_lost, 0);
    }

    #[test]
    fn nonce_gap_counts_losses() {
        let (mut alice, mut bob) = linked_pair();

        for _ in 0..4 {
            let _ = alice.encrypt(b"dropped on the floor").unwrap();
        }
        let wire = alice.encrypt(b"arrives").unwrap();

        assert!(bob.decrypt(&wire).is_some());
        let stats = bob.stats();
        assert_eq!(stats.local_good, 1);
        assert_eq!(stats.local_lost, 4);
    }

    #[test]
    fn decrypt_nonce_resync_bumps_counter() {
        let (_, mut bob) = linked_pair();

        bob.set_decrypt_nonce(&[0x44; 16]).unwrap();
        assert_eq!(bob.stats().local_resync, 1);
    }

    #[test]
    fn empty_payload_round_trips() {
        let (mut alice, mut bob) = linked_pair();
        let wire = alice.encrypt(b"").unwrap();
        assert_eq!(wire.len(), TAG_OVERHEAD);
        assert_eq!(bob.decrypt(&wire).unwrap(), Vec::<u8>::new());
    }

    proptest! {
        /// Every payload within the datagram budget round-trips with
        /// exactly four bytes of overhead.
        #[test]
        fn round_trip_within_budget(plain in prop::collection::vec(any::<u8>(), 0..=1020)) {
            let (mut alice, mut bob) = linked_pair();

            let wire = alice.encrypt(&plain).unwrap();
            prop_assert_eq!(wire.len(), plain.len() + TAG_OVERHEAD);
            prop_assert_eq!(bob.decrypt(&wire).unwrap(), plain);
        }

        /// Arbitrary garbage never panics the decrypt path.
        #[test]
        fn garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
            let (_, mut bob) = linked_pair();
            let _ = bob.decrypt(&data);
        }
    }
}
