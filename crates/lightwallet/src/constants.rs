/// AID of the wallet applet
pub const KEYCARD_AID: &[u8] = b"\xA0\x00\x00\x08\x04\x00\x01\x01";

/// Salt used by Keycard applets when stretching the pairing password
pub const KEYCARD_PAIRING_SALT: &str = "Keycard Pairing Password Salt";
/// Salt used by the earlier lightwallet applet generation
pub const LIGHTWALLET_PAIRING_SALT: &str = "Status Hardware Wallet Lite";
/// PBKDF2-HMAC-SHA256 rounds applied to the pairing password
pub const DEFAULT_PAIRING_ITERATIONS: u32 = 50_000;

/// Length of host and card challenges, cryptograms and pairing keys
pub const CHALLENGE_LENGTH: usize = 32;
/// Length of the secure channel IV / MAC
pub const IV_LENGTH: usize = 16;
/// Largest plaintext a secure channel command can carry: padded ciphertext
/// plus MAC must still fit a one-byte Lc
pub const MAX_SECURE_DATA_LENGTH: usize = 223;

/// Instruction bytes
pub mod ins {
    /// SELECT (by name)
    pub const SELECT: u8 = 0xA4;
    /// INIT
    pub const INIT: u8 = 0xFE;
    /// PAIR
    pub const PAIR: u8 = 0x12;
    /// OPEN SECURE CHANNEL
    pub const OPEN_SECURE_CHANNEL: u8 = 0x10;
    /// MUTUALLY AUTHENTICATE
    pub const MUTUALLY_AUTHENTICATE: u8 = 0x11;
}

/// P1 values of PAIR
pub mod pair_p1 {
    /// PAIR first step: host challenge
    pub const FIRST_STEP: u8 = 0x00;
    /// PAIR final step: host cryptogram
    pub const FINAL_STEP: u8 = 0x01;
}

/// BER-TLV tags of SELECT responses
pub mod tags {
    /// First byte of a SELECT response from a card that has not been initialized yet.
    /// The response is `80 LL <public key>`.
    pub const SELECT_RESPONSE_PRE_INITIALIZED: u8 = 0x80;
    /// Application info template containing:
    /// - INSTANCE_UID
    /// - ECC_PUBLIC_KEY
    /// - OTHER (application version, then number of remaining pairing slots)
    /// - KEY_UID
    /// - CAPABILITIES (newer applets only)
    pub const TEMPLATE_APPLICATION_INFO: u8 = 0xA4;

    /// Instance UID (16 bytes)
    pub const INSTANCE_UID: u8 = 0x8F;
    /// ECC Public Key (Uncompressed, ie. 65 bytes, or 0 bytes if not available)
    pub const ECC_PUBLIC_KEY: u8 = 0x80;
    /// Application version (2 bytes) / number of remaining pairing slots (1 byte)
    pub const OTHER: u8 = 0x02;
    /// Key UID (32 bytes)
    pub const KEY_UID: u8 = 0x8E;
    /// Keycard capabilities (1 byte)
    pub const CAPABILITIES: u8 = 0x8D;
}
