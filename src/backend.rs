//! Backend identities.
//!
//! The set is closed: adding a backend means extending [`Backend`] and
//! every resolver `match`, which the compiler enforces. Textual names
//! from configuration or the command line are the only place an
//! unrecognized identity can appear, and parsing rejects it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    /// Multi-threaded CPU: one thread-pool task per outer index.
    Threads,
    /// Vectorized CPU: outer indices processed in fixed-width lane batches.
    Simd,
    /// GPU vendor A.
    Cuda,
    /// GPU vendor B.
    Rocm,
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Threads, Backend::Simd, Backend::Cuda, Backend::Rocm];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Threads => "threads",
            Backend::Simd => "simd",
            Backend::Cuda => "cuda",
            Backend::Rocm => "rocm",
        }
    }

    pub fn is_gpu(self) -> bool {
        matches!(self, Backend::Cuda | Backend::Rocm)
    }

    pub fn is_cpu(self) -> bool {
        !self.is_gpu()
    }

    /// Short human description, used by `parakern backends`.
    pub fn description(self) -> &'static str {
        match self {
            Backend::Threads => "multi-threaded CPU (one block per outer index)",
            Backend::Simd => "vectorized CPU (outer indices in lane batches)",
            Backend::Cuda => "GPU vendor A (dynamic shared memory with offsets)",
            Backend::Rocm => "GPU vendor B (static local arrays, no show)",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threads" | "cpu" | "multithreaded" => Ok(Backend::Threads),
            "simd" | "vectorized" | "batch" => Ok(Backend::Simd),
            "cuda" => Ok(Backend::Cuda),
            "rocm" | "amdgpu" | "hip" => Ok(Backend::Rocm),
            _ => Err(ResolveError::UnsupportedBackend {
                identity: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = ResolveError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Backend> for String {
    fn from(backend: Backend) -> String {
        backend.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(backend.name().parse::<Backend>(), Ok(backend));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("CPU".parse::<Backend>(), Ok(Backend::Threads));
        assert_eq!("vectorized".parse::<Backend>(), Ok(Backend::Simd));
        assert_eq!(" amdgpu ".parse::<Backend>(), Ok(Backend::Rocm));
        assert_eq!("hip".parse::<Backend>(), Ok(Backend::Rocm));
    }

    #[test]
    fn test_unknown_identity_is_carried_verbatim() {
        assert_eq!(
            "OpenCL".parse::<Backend>(),
            Err(ResolveError::UnsupportedBackend {
                identity: "OpenCL".to_string()
            })
        );
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Binding {
            backend: Backend,
        }

        let text = toml::to_string(&Binding {
            backend: Backend::Simd,
        })
        .unwrap();
        assert_eq!(text, "backend = \"simd\"\n");

        let parsed: Binding = toml::from_str("backend = \"batch\"").unwrap();
        assert_eq!(parsed.backend, Backend::Simd);
        assert!(toml::from_str::<Binding>("backend = \"metal\"").is_err());

        assert_eq!(Backend::try_from("HIP".to_string()), Ok(Backend::Rocm));
        assert_eq!(String::from(Backend::Cuda), "cuda");
    }

    #[test]
    fn test_gpu_classification() {
        assert!(Backend::Cuda.is_gpu());
        assert!(Backend::Rocm.is_gpu());
        assert!(Backend::Threads.is_cpu());
        assert!(Backend::Simd.is_cpu());
    }
}
