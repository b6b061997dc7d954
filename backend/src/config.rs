use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file holding the issuance ledger.
    pub db_path: PathBuf,
    /// Directory the rendered PDFs are written to.
    pub output_dir: PathBuf,
    /// Base directory for relative assets (`[img:...]` lines) and `fonts/`.
    pub base_dir: PathBuf,
    /// Replaces the built-in document skeleton when set.
    pub document_template: Option<PathBuf>,
    pub open_browser: bool,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let base_dir = match env::var("CERTIFICATES_BASE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => env::current_dir().map_err(|e| e.to_string())?,
        };

        Ok(Config {
            host: env::var("CERTIFICATES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("CERTIFICATES_PORT", 8080)?,
            db_path: env::var("CERTIFICATES_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| base_dir.join("certificates.db")),
            output_dir: env::var("CERTIFICATES_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| base_dir.join("generated").join("pdfs")),
            document_template: env::var("CERTIFICATES_DOCUMENT_TEMPLATE").ok().map(PathBuf::from),
            open_browser: parse_var("CERTIFICATES_OPEN_BROWSER", false)?,
            max_upload_bytes: parse_var("CERTIFICATES_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            base_dir,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default() {
        assert_eq!(parse_var("CERTIFICATES_TEST_UNSET_VARIABLE", 42u16), Ok(42));
    }

    #[test]
    fn parse_var_rejects_garbage() {
        env::set_var("CERTIFICATES_TEST_BAD_PORT", "eighty");
        let err = parse_var::<u16>("CERTIFICATES_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(err.contains("CERTIFICATES_TEST_BAD_PORT"));
    }
}
