use serde::{Deserialize, Serialize};
use derive_more::Display;
use std::str::FromStr;
use std::convert::TryFrom;
use rand_core::OsRng;
use password_hash::SaltString;
use crate::utils::errors::{ErrorCode, WardenError};

///
/// The digest primitive is opaque to the rest of the subsystem: a slow, salted
/// one-way hash producing a PHC string, and a verify that sniffs the algorithm
/// back out of the PHC prefix.
///
#[derive(Clone, Copy, Debug, Deserialize, Display, Serialize, PartialEq)]
pub enum Algorithm {
    Argon,
    BCrypt,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Serialize, PartialEq)]
pub enum ArgonHashType {
    ARGON2D,
    ARGON2I,
    ARGON2ID
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ArgonPolicy {
    pub parallelism: u32,
    pub memory_size_kb: u32,
    pub iterations: u32,
    pub version: u32,
    pub hash_type: ArgonHashType
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum BCryptVersion {
    TwoA,
    TwoB,
    TwoX,
    TwoY
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BcryptPolicy {
    pub version: BCryptVersion,
    pub cost: u32
}

///
/// Check the plain text password matches the digest provided.
///
/// The algorithm is selected from the PHC string, so digests hashed under a
/// previous policy still verify after the active policy changes.
///
pub fn verify(plain_text_password: &str, phc: &str) -> Result<bool, WardenError> {
    match select(phc)? {
        Algorithm::Argon  => verify_argon(phc, plain_text_password),
        Algorithm::BCrypt => verify_bcrypt(phc, plain_text_password),
    }
}

///
/// Parse the first part of the phc string and return the algorithm.
///
fn select(phc: &str) -> Result<Algorithm, WardenError> {
    let mut split = phc.split('$');
    split.next(); /* Skip first it's blank */

    match split.next() {
        Some(algorithm) => Algorithm::from_str(algorithm),
        None => Err(ErrorCode::InvalidPHCFormat.with_msg("The PHC is invalid, there's no algorithm")),
    }
}

impl FromStr for Algorithm {
    type Err = WardenError;

    fn from_str(input: &str) -> Result<Algorithm, Self::Err> {
        match input {
            "argon2i" |
            "argon2d" |
            "argon2id" => Ok(Algorithm::Argon),
            "2a"      |
            "2b"      |
            "2x"      |
            "2y"       => Ok(Algorithm::BCrypt),
            _          => Err(ErrorCode::InvalidPHCFormat.with_msg(&format!("algorithm {} is un-handled", input))),
        }
    }
}

fn verify_argon(phc: &str, plain_text_password: &str) -> Result<bool, WardenError> {
    let parsed_hash = argon2::PasswordHash::new(phc)
        .map_err(|_| ErrorCode::InvalidPHCFormat.with_msg("The stored digest could not be parsed"))?;

    match argon2::PasswordVerifier::verify_password(&argon2::Argon2::default(), plain_text_password.as_bytes(), &parsed_hash) {
        Ok(_)  => Ok(true),
        Err(_) => Ok(false),
    }
}

fn verify_bcrypt(phc: &str, plain_text_password: &str) -> Result<bool, WardenError> {
    bcrypt::verify(plain_text_password, phc).map_err(WardenError::from)
}

impl Default for ArgonPolicy {
    fn default() -> Self {
        ArgonPolicy {
            parallelism: 1,
            memory_size_kb: 1024 * 16,
            iterations: 1,
            version: 19,
            hash_type: ArgonHashType::ARGON2ID
        }
    }
}

impl ArgonPolicy {
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, WardenError> {
        let password = plain_text_password.as_bytes();
        let salt = SaltString::generate(&mut OsRng);

        let argon2 = argon2::Argon2::new(
            None,
            self.iterations,
            self.memory_size_kb,
            self.parallelism,
            argon2::Version::try_from(self.version)?)?;

        // Hash password to PHC string ($argon2id$v=19$...)
        Ok(argon2::PasswordHasher::hash_password_simple(&argon2, password, salt.as_ref())?.to_string())
    }
}

impl Default for BcryptPolicy {
    fn default() -> Self {
        Self {
            version: BCryptVersion::TwoB,
            cost: 4 // Performance for tests - always chose stronger in prod.
        }
    }
}

impl BcryptPolicy {
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, WardenError> {
        // Use argon to generate a salt.
        let salt = SaltString::generate(&mut OsRng);
        let salt: String = salt.as_str().chars().take(16).collect();
        let hashed = bcrypt::hash_with_salt(plain_text_password, self.cost, salt.as_bytes())?;

        Ok(hashed.format_for_version(self.version.into()))
    }
}

impl From<BCryptVersion> for bcrypt::Version {
    fn from(version: BCryptVersion) -> Self {
        match version {
            BCryptVersion::TwoA => bcrypt::Version::TwoA,
            BCryptVersion::TwoB => bcrypt::Version::TwoB,
            BCryptVersion::TwoX => bcrypt::Version::TwoX,
            BCryptVersion::TwoY => bcrypt::Version::TwoY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_argon2id() -> Result<(), WardenError> {
        let phc = "$argon2id$v=19$m=16384,t=20,p=1$77QFGJMDLMwvR7+lYvuNtw$82Byd2enomP62Z01Wcb1g5+KApYhQygW6BEYCXnZj5A";
        assert_eq!(select(phc)?, Algorithm::Argon);
        Ok(())
    }

    #[test]
    fn test_select_bcrypt() -> Result<(), WardenError> {
        let phc = "$2b$04$ZLOszBpG0M/d1sDW9Wy2zOVcf4SXMsEjTgoHCYjz8OpBRC0fd0upm";
        assert_eq!(select(phc)?, Algorithm::BCrypt);
        Ok(())
    }

    #[test]
    fn test_select_rejects_garbage() {
        assert!(select("not-a-phc-string").is_err());
    }

    #[test]
    fn test_bcrypt_digests_round_trip() -> Result<(), WardenError> {
        let phc = BcryptPolicy::default().hash_into_phc("W!bbl321")?;
        assert!(verify("W!bbl321", &phc)?);
        assert!(!verify("Hello456!", &phc)?);
        Ok(())
    }

    #[test]
    fn test_argon_digests_round_trip() -> Result<(), WardenError> {
        let phc = ArgonPolicy::default().hash_into_phc("W!bbl321")?;
        assert!(verify("W!bbl321", &phc)?);
        assert!(!verify("Hello456!", &phc)?);
        Ok(())
    }

    #[test]
    fn test_two_hashes_of_the_same_password_differ() -> Result<(), WardenError> {
        // Salted - equal plaintexts never produce equal digests.
        let first = BcryptPolicy::default().hash_into_phc("W!bbl321")?;
        let second = BcryptPolicy::default().hash_into_phc("W!bbl321")?;
        assert_ne!(first, second);
        Ok(())
    }
}
