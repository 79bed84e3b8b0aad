//! Registro de transacción tal como vive en el almacén primario (y, por
//! copia idéntica, en la cola de relay). Inmutable una vez creado: el relay
//! sólo lo lee, lo transforma a `ScoringRequest` y lo borra de la cola.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::columns::{AMOUNT_COLUMN, CLASS_COLUMN, FEATURE_COLUMNS};
use crate::scoring::ScoringRequest;

/// Formato canónico con el que el relay rinde el timestamp en el payload.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Identificador asignado por el almacén primario (ascendente; clave de
    /// orden FIFO de la cola de relay).
    pub id: i64,
    /// Timestamp del evento en segundos epoch.
    pub time_stamp: f64,
    /// Features anonimizadas V1..V28, en orden posicional.
    pub features: [f64; 28],
    /// Monto de la transacción.
    pub amount: f64,
    /// Etiqueta de verdad conocida, si existe.
    pub class: Option<i32>,
}

impl TransactionRecord {
    /// Rinde `time_stamp` en la forma textual canónica del contrato
    /// (`%Y-%m-%d %H:%M:%S`, UTC). Un epoch fuera de rango degrada al valor
    /// numérico crudo en vez de fallar.
    pub fn formatted_time(&self) -> String {
        let secs = self.time_stamp.trunc() as i64;
        let nanos = (self.time_stamp.fract() * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.format(TIME_FORMAT).to_string())
            .unwrap_or_else(|| self.time_stamp.to_string())
    }

    /// Construye el `ScoringRequest` del contrato HTTP: timestamp textual y
    /// todos los valores numéricos stringificados, en el orden de columnas
    /// del payload original (V1..V28, Amount, Class si existe).
    pub fn to_scoring_request(&self) -> ScoringRequest {
        let mut request = ScoringRequest::new(self.formatted_time());
        for (name, value) in FEATURE_COLUMNS.iter().zip(self.features.iter()) {
            request.values.insert((*name).to_string(), value.to_string());
        }
        request.values.insert(AMOUNT_COLUMN.to_string(), self.amount.to_string());
        if let Some(class) = self.class {
            request.values.insert(CLASS_COLUMN.to_string(), class.to_string());
        }
        request
    }
}
