//! Log de auditoría append-only en CSV.
//!
//! Cada registro aceptado por `/cross_validate` se anexa (campos de entrada
//! más la clase predicha, sin encabezado) antes de responder. El append es
//! síncrono dentro del request; el mutex serializa escritores concurrentes
//! sobre el mismo archivo.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fraud_domain::ScoringResponse;

use crate::error::ScoringError;

pub struct AuditLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Anexa una fila: `Time`, las columnas del request en su orden, y
    /// `Predicted_Class` al final.
    pub fn append(&self, response: &ScoringResponse) -> Result<(), ScoringError> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let file = OpenOptions::new().create(true)
                                     .append(true)
                                     .open(&self.path)
                                     .map_err(|e| ScoringError::Audit(format!("open {}: {e}", self.path.display())))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        let mut fields: Vec<String> = Vec::with_capacity(response.values.len() + 2);
        fields.push(response.time.clone());
        fields.extend(response.values.values().cloned());
        fields.push(response.predicted_class.to_string());
        writer.write_record(&fields)
              .map_err(|e| ScoringError::Audit(format!("write: {e}")))?;
        writer.flush()
              .map_err(|e| ScoringError::Audit(format!("flush: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_domain::ScoringRequest;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("fraudflow_audit_{}_{}.csv", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn response() -> ScoringResponse {
        let mut request = ScoringRequest::new("2023-11-14 22:13:20".to_string());
        request.values.insert("V1".to_string(), "0.5".to_string());
        request.values.insert("Amount".to_string(), "49.99".to_string());
        ScoringResponse::from_request(request, 0)
    }

    #[test]
    fn append_writes_one_csv_line_per_call() {
        let path = temp_path("lines");
        let audit = AuditLog::new(&path);
        audit.append(&response()).unwrap();
        audit.append(&response()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "2023-11-14 22:13:20,0.5,49.99,0");
        let _ = std::fs::remove_file(&path);
    }
}
