//! Solana wallet - ed25519 key from SLIP-0010, base58 everywhere.

use crate::error::{WalletError, WalletResult};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use zeroize::Zeroizing;

#[derive(Clone)]
pub struct SolanaWallet {
    signing_key: SigningKey,
}

impl SolanaWallet {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self { signing_key: SigningKey::from_bytes(secret) }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Base58 public key.
    pub fn address(&self) -> String {
        bs58::encode(self.verifying_key().as_bytes()).into_string()
    }

    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Signs the serialized transaction message (what goes after the signature array).
    pub fn sign_transaction(&self, message: &[u8]) -> [u8; 64] {
        self.sign_message(message)
    }

    /// Base58 of the 64-byte `secret || public` keypair, the format wallets import.
    pub fn export_private_key(&self) -> Zeroizing<String> {
        let keypair = Zeroizing::new(self.signing_key.to_keypair_bytes());
        Zeroizing::new(bs58::encode(&keypair[..]).into_string())
    }
}

pub fn verify(address: &str, message: &[u8], signature: &[u8; 64]) -> WalletResult<()> {
    let bytes: [u8; 32] = bs58::decode(address)
        .into_vec()
        .map_err(|e| WalletError::InvalidAddress(e.to_string()))?
        .try_into()
        .map_err(|_| WalletError::InvalidAddress(format!("{} is not a 32-byte key", address)))?;
    let key = VerifyingKey::from_bytes(&bytes).map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
    key.verify(message, &Signature::from_bytes(signature))
        .map_err(|e| WalletError::Signing(e.to_string()))
}

impl std::fmt::Debug for SolanaWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaWallet").field("address", &self.address()).finish()
    }
}
