//! circuit artifact loading
//!
//! each circuit ships as a serialized groth16 key pair under
//! `artifacts/<name>.zkey` / `artifacts/<name>.vkey`. the loader pulls
//! every artifact eagerly at startup — either from disk or over http,
//! selected by configuration, never by runtime detection — and logs the
//! digest of each blob so operators can pin what they are verifying
//! against. after initialization the accessors are pure.

use std::path::{Path, PathBuf};

use ark_bn254::Bn254;
use ark_crypto_primitives::snark::CircuitSpecificSetupSNARK;
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{ProofError, Result};
use crate::ragequit::CommitmentCircuit;
use crate::withdraw::WithdrawCircuit;

/// where artifacts come from
#[derive(Clone, Debug)]
pub enum ArtifactBackend {
    Filesystem(PathBuf),
    Http(String),
}

impl ArtifactBackend {
    async fn fetch(&self, name: &str, rel: &str) -> Result<Vec<u8>> {
        match self {
            ArtifactBackend::Filesystem(base) => tokio::fs::read(base.join(rel))
                .await
                .map_err(|e| ProofError::FetchArtifact {
                    name: name.into(),
                    cause: format!("{}: {}", base.join(rel).display(), e),
                }),
            ArtifactBackend::Http(base) => {
                let url = format!("{}/{}", base.trim_end_matches('/'), rel);
                let response =
                    reqwest::get(&url)
                        .await
                        .map_err(|e| ProofError::FetchArtifact {
                            name: name.into(),
                            cause: e.to_string(),
                        })?;
                if !response.status().is_success() {
                    return Err(ProofError::FetchArtifact {
                        name: name.into(),
                        cause: format!("{} returned {}", url, response.status()),
                    });
                }
                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| ProofError::FetchArtifact {
                        name: name.into(),
                        cause: e.to_string(),
                    })
            }
        }
    }
}

/// loaded key material for one circuit
#[derive(Debug)]
pub struct CircuitKeys {
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
    pub prepared: PreparedVerifyingKey<Bn254>,
}

impl CircuitKeys {
    fn new(proving_key: ProvingKey<Bn254>, verifying_key: VerifyingKey<Bn254>) -> Self {
        let prepared = prepare_verifying_key(&verifying_key);
        Self {
            proving_key,
            verifying_key,
            prepared,
        }
    }
}

/// all circuit keys, initialized once
#[derive(Debug)]
pub struct ArtifactStore {
    commitment: CircuitKeys,
    withdraw: CircuitKeys,
}

impl ArtifactStore {
    /// eagerly load every circuit's keys; any failure is fatal
    pub async fn init(backend: &ArtifactBackend) -> Result<Self> {
        let commitment = Self::load_circuit(backend, "commitment").await?;
        let withdraw = Self::load_circuit(backend, "withdraw").await?;
        Ok(Self {
            commitment,
            withdraw,
        })
    }

    async fn load_circuit(backend: &ArtifactBackend, name: &str) -> Result<CircuitKeys> {
        let zkey_bytes = backend
            .fetch(name, &format!("artifacts/{name}.zkey"))
            .await?;
        let vkey_bytes = backend
            .fetch(name, &format!("artifacts/{name}.vkey"))
            .await?;
        info!(
            circuit = name,
            zkey_sha256 = %hex::encode(Sha256::digest(&zkey_bytes)),
            vkey_sha256 = %hex::encode(Sha256::digest(&vkey_bytes)),
            "loaded circuit artifacts"
        );

        let proving_key = ProvingKey::deserialize_uncompressed_unchecked(zkey_bytes.as_slice())
            .map_err(|e| ProofError::CircuitInitialization(format!("{name} zkey: {e}")))?;
        let verifying_key = VerifyingKey::deserialize_uncompressed_unchecked(vkey_bytes.as_slice())
            .map_err(|e| ProofError::CircuitInitialization(format!("{name} vkey: {e}")))?;
        Ok(CircuitKeys::new(proving_key, verifying_key))
    }

    pub fn commitment(&self) -> &CircuitKeys {
        &self.commitment
    }

    pub fn withdraw(&self) -> &CircuitKeys {
        &self.withdraw
    }

    /// test seam: one key pair serving both circuit slots
    #[doc(hidden)]
    pub fn from_keys_for_tests(pk: ProvingKey<Bn254>, vk: VerifyingKey<Bn254>) -> Self {
        Self {
            commitment: CircuitKeys::new(pk.clone(), vk.clone()),
            withdraw: CircuitKeys::new(pk, vk),
        }
    }
}

/// generate and write a fresh artifact set (development tool; production
/// keys come from the ceremony output)
pub fn write_artifact_files(dir: &Path) -> Result<()> {
    let artifacts = dir.join("artifacts");
    std::fs::create_dir_all(&artifacts)
        .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;

    let mut rng = rand::thread_rng();
    let (commitment_pk, commitment_vk) =
        Groth16::<Bn254>::setup(CommitmentCircuit::blank(), &mut rng)
            .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;
    write_keys(&artifacts, "commitment", &commitment_pk, &commitment_vk)?;

    let (withdraw_pk, withdraw_vk) = Groth16::<Bn254>::setup(WithdrawCircuit::blank(), &mut rng)
        .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;
    write_keys(&artifacts, "withdraw", &withdraw_pk, &withdraw_vk)?;

    Ok(())
}

fn write_keys(
    dir: &Path,
    name: &str,
    pk: &ProvingKey<Bn254>,
    vk: &VerifyingKey<Bn254>,
) -> Result<()> {
    let mut zkey = Vec::new();
    pk.serialize_uncompressed(&mut zkey)
        .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;
    std::fs::write(dir.join(format!("{name}.zkey")), &zkey)
        .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;

    let mut vkey = Vec::new();
    vk.serialize_uncompressed(&mut vkey)
        .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;
    std::fs::write(dir.join(format!("{name}.vkey")), &vkey)
        .map_err(|e| ProofError::CircuitInitialization(e.to_string()))?;

    info!(circuit = name, bytes = zkey.len(), "wrote circuit artifacts");
    Ok(())
}
