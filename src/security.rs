use std::path::PathBuf;
use std::{env, fs};

const TOKEN_SECRET_FILE: &str = "token.secret";

/// Security material shared by token issuing and registration.
///
/// Loaded once at startup and injected into rocket's managed state; routes
/// and request guards read it from there instead of process-wide globals.
#[derive(Clone)]
pub struct Security {
    /// HMAC secret used to sign and verify session tokens.
    pub token_secret: Vec<u8>,
    /// Shared code required to register a teacher account. `None` disables
    /// teacher registration entirely.
    pub teacher_code: Option<String>,
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

#[cfg(debug_assertions)]
fn default_teacher_code() -> Option<String> {
    Some(String::from("staffroom"))
}
#[cfg(not(debug_assertions))]
fn default_teacher_code() -> Option<String> {
    None
}

// One SHA-256 block; array lengths past 32 need rand's `min_const_gen`.
#[cfg(feature = "generate-security")]
fn generate_token_secret() -> [u8; 64] {
    rand::random()
}

impl Security {
    pub fn load() -> Security {
        let dir = security_dir();

        if cfg!(feature = "generate-security") {
            fs::create_dir_all(dir.clone())
                .expect("unable to create directory for storing security information");
        }

        tracing::info!("Loading token signing secret...");
        let token_secret = match env::var("TOKEN_SECRET") {
            Ok(secret) => secret.into_bytes(),
            Err(_) => match fs::read(dir.join(TOKEN_SECRET_FILE)) {
                Ok(secret) => {
                    tracing::info!("Signing secret found and loaded.");
                    secret
                }
                #[cfg(feature = "generate-security")]
                Err(_) => {
                    tracing::info!(
                        "Secret not found in '{}'. Generating a new signing secret.",
                        dir.join(TOKEN_SECRET_FILE).display()
                    );
                    let secret = generate_token_secret();

                    fs::write(dir.join(TOKEN_SECRET_FILE), secret)
                        .expect("unable to write signing secret");
                    secret.to_vec()
                }
                #[cfg(not(feature = "generate-security"))]
                Err(_) => {
                    panic!("Unable to load token signing secret.");
                }
            },
        };

        let teacher_code = env::var("TEACHER_CODE").ok().or_else(default_teacher_code);
        match &teacher_code {
            Some(_) => tracing::info!("Teacher registration code configured."),
            None => tracing::warn!("No teacher registration code; teacher signup is disabled."),
        }

        Security {
            token_secret,
            teacher_code,
        }
    }
}

// Secrets stay out of logs; routes carry &State<Security> through
// #[tracing::instrument] calls.
impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("token_secret", &format!("[{} bytes]", self.token_secret.len()))
            .field("teacher_code", &self.teacher_code.as_ref().map(|_| "[set]"))
            .finish()
    }
}

#[cfg(test)]
impl Security {
    /// Fixed material for tests; nothing is read from disk or env.
    pub fn test_fixture() -> Security {
        Security {
            token_secret: b"coursehub-test-signing-secret-0123456789".to_vec(),
            teacher_code: Some(String::from("staffroom")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "generate-security")]
    #[test]
    fn generated_signing_secrets_are_random_per_call() {
        assert_ne!(
            generate_token_secret(),
            generate_token_secret(),
            "secret generation must not repeat"
        );
    }
}
