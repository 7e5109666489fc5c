use crate::error::{Error, Result};
use crate::FeatureId;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

/// Sentinel returned by the membership oracle for a non-member.
pub const NOT_A_MEMBER: FeatureId = -1;

/// Substitution token used when one half of a bigram is out of vocabulary.
pub const UNK: &str = "<UNK>";

/// Black-box membership function over a precomputed vocabulary, backed by a
/// minimum-perfect-hash key structure plus a verification signature.
/// Returns a unique non-negative id per accepted string, -1 otherwise.
pub trait MembershipOracle {
    fn index(&self, feature: &str) -> FeatureId;
}

/// Resolve a feature to its id, applying the unknown-token substitution rule
/// for two-token-plus-distance features of the form `"A B d"`:
/// query `"<UNK> B d"` and `"A <UNK> d"`; if exactly one matches, the product
/// of the two results is negative and its magnitude is the matching id. If
/// both match (ambiguous) or neither does, the feature is not a member.
///
/// The sign trick relies on -1 being the only negative oracle result and on
/// legitimate ids being strictly positive; an oracle that can return 0 would
/// make the one-sided case indistinguishable from a miss.
pub fn resolve<O: MembershipOracle + ?Sized>(oracle: &O, feature: &str) -> Option<FeatureId> {
    let id = oracle.index(feature);
    if id != NOT_A_MEMBER {
        return Some(id);
    }
    let parts: Vec<&str> = feature.split(' ').collect();
    if parts.len() != 3 {
        return None;
    }
    let k1 = oracle.index(&format!("{UNK} {} {}", parts[1], parts[2]));
    let k2 = oracle.index(&format!("{} {UNK} {}", parts[0], parts[2]));
    let product = i128::from(k1) * i128::from(k2);
    if product < 0 {
        Some(product.unsigned_abs() as FeatureId)
    } else {
        None
    }
}

const KEY_TAG: u8 = 0x4b;
const SIG_TAG: u8 = 0x53;

fn hash64(tag: u8, s: &str) -> u64 {
    let mut hasher = Sha1::new();
    hasher.update([tag]);
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// File-backed membership oracle. The key structure maps a primary hash of
/// each accepted string to its id; the signature table holds a secondary hash
/// per id, checked on lookup to reject collisions. Ids are issued from 1 so
/// that 0 never appears and the sign trick in [`resolve`] stays sound.
#[derive(Debug, Default)]
pub struct MphVocabulary {
    keys: HashMap<u64, FeatureId>,
    signatures: HashMap<FeatureId, u64>,
}

#[derive(Serialize, Deserialize)]
struct KeyArtifact(HashMap<u64, FeatureId>);

#[derive(Serialize, Deserialize)]
struct SignatureArtifact(HashMap<FeatureId, u64>);

impl MphVocabulary {
    /// Build a vocabulary from accepted feature strings, assigning ids in
    /// iteration order starting at 1. Duplicates keep their first id.
    pub fn build<I>(features: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut vocab = MphVocabulary::default();
        let mut next_id: FeatureId = 1;
        for feature in features {
            let feature = feature.as_ref();
            let key = hash64(KEY_TAG, feature);
            if vocab.keys.contains_key(&key) {
                continue;
            }
            vocab.keys.insert(key, next_id);
            vocab.signatures.insert(next_id, hash64(SIG_TAG, feature));
            next_id += 1;
        }
        vocab
    }

    pub fn open(keys_path: &Path, signature_path: &Path) -> Result<Self> {
        let keys: KeyArtifact = read_artifact(keys_path)?;
        let signatures: SignatureArtifact = read_artifact(signature_path)?;
        Ok(MphVocabulary {
            keys: keys.0,
            signatures: signatures.0,
        })
    }

    pub fn save(&self, keys_path: &Path, signature_path: &Path) -> Result<()> {
        write_artifact(keys_path, &KeyArtifact(self.keys.clone()))?;
        write_artifact(signature_path, &SignatureArtifact(self.signatures.clone()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl MembershipOracle for MphVocabulary {
    fn index(&self, feature: &str) -> FeatureId {
        match self.keys.get(&hash64(KEY_TAG, feature)) {
            Some(&id) if self.signatures.get(&id) == Some(&hash64(SIG_TAG, feature)) => id,
            _ => NOT_A_MEMBER,
        }
    }
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::AbsentResource {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(Error::io(format!("opening {}", path.display()), e)),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
    bincode::deserialize(&buf).map_err(|source| Error::CorruptState {
        path: path.to_path_buf(),
        source,
    })
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value).map_err(|source| Error::CorruptState {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file =
        File::create(path).map_err(|e| Error::io(format!("creating {}", path.display()), e))?;
    file.write_all(&bytes)
        .map_err(|e| Error::io(format!("writing {}", path.display()), e))
}
