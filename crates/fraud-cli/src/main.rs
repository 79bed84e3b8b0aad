use fraud_core::RelayQueue;
use fraud_domain::TransactionRecord;
use fraud_persistence::{build_dev_pool_from_env, PgRelayQueue, PgTransactionStore, PoolProvider};

fn main() {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    // CLI mínima de operación:
    //   fraud depth
    //   fraud dead-letter [--limit <N>]
    //   fraud requeue --id <N>
    //   fraud insert --amount <X> [--class <N>] [--time <EPOCH>]
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Uso: fraud <depth | dead-letter | requeue | insert> [opciones]");
        std::process::exit(2);
    }
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("[fraud] requiere DATABASE_URL para operar contra la cola persistente");
        std::process::exit(4);
    }
    let pool = match build_dev_pool_from_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[fraud] pool error: {e}");
            std::process::exit(5);
        }
    };

    match args[1].as_str() {
        "depth" => {
            let mut queue = PgRelayQueue::new(PoolProvider { pool });
            let depth = match queue.depth() {
                Ok(d) => d,
                Err(e) => { eprintln!("[fraud depth] error: {e}"); std::process::exit(5); }
            };
            let dead = match queue.dead_letter_count() {
                Ok(d) => d,
                Err(e) => { eprintln!("[fraud depth] error: {e}"); std::process::exit(5); }
            };
            println!("relay_queue: {depth} pendientes, dead_letter: {dead}");
        }
        "dead-letter" => {
            let mut limit: i64 = 20;
            let mut i = 2;
            while i < args.len() {
                if args[i].as_str() == "--limit" {
                    i += 1;
                    if i < args.len() { limit = args[i].parse().unwrap_or(20); }
                }
                i += 1;
            }
            let queue = PgRelayQueue::new(PoolProvider { pool });
            match queue.dead_letters(limit) {
                Ok(entries) if entries.is_empty() => println!("dead_letter vacío"),
                Ok(entries) => {
                    for entry in entries {
                        println!("id={} amount={} attempts={} error={}",
                                 entry.record.id, entry.record.amount, entry.attempts,
                                 entry.last_error);
                    }
                }
                Err(e) => { eprintln!("[fraud dead-letter] error: {e}"); std::process::exit(5); }
            }
        }
        "requeue" => {
            let mut id: Option<i64> = None;
            let mut i = 2;
            while i < args.len() {
                if args[i].as_str() == "--id" {
                    i += 1;
                    if i < args.len() { id = args[i].parse().ok(); }
                }
                i += 1;
            }
            let Some(id) = id else {
                eprintln!("Uso: fraud requeue --id <N>");
                std::process::exit(2);
            };
            let queue = PgRelayQueue::new(PoolProvider { pool });
            match queue.requeue(id) {
                Ok(true) => println!("requeued: id={id}"),
                Ok(false) => { eprintln!("[fraud requeue] id {id} no está en dead_letter"); std::process::exit(4); }
                Err(e) => { eprintln!("[fraud requeue] error: {e}"); std::process::exit(5); }
            }
        }
        "insert" => {
            let mut amount: Option<f64> = None;
            let mut class: Option<i32> = None;
            let mut time_stamp: f64 = 1_700_000_000.0;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--amount" => {
                        i += 1;
                        if i < args.len() { amount = args[i].parse().ok(); }
                    }
                    "--class" => {
                        i += 1;
                        if i < args.len() { class = args[i].parse().ok(); }
                    }
                    "--time" => {
                        i += 1;
                        if i < args.len() { time_stamp = args[i].parse().unwrap_or(time_stamp); }
                    }
                    _ => {}
                }
                i += 1;
            }
            let Some(amount) = amount else {
                eprintln!("Uso: fraud insert --amount <X> [--class <N>] [--time <EPOCH>]");
                std::process::exit(2);
            };
            // Registro sintético con features en cero: suficiente para
            // ejercitar el trigger de captura de punta a punta.
            let record = TransactionRecord { id: 0,
                                             time_stamp,
                                             features: [0.0; 28],
                                             amount,
                                             class };
            let store = PgTransactionStore::new(PoolProvider { pool });
            match store.insert(&record) {
                Ok(id) => println!("insertado: id={id} (capturado en relay_queue)"),
                Err(e) => { eprintln!("[fraud insert] error: {e}"); std::process::exit(5); }
            }
        }
        other => {
            eprintln!("[fraud] subcomando desconocido: {other}");
            eprintln!("Uso: fraud <depth | dead-letter | requeue | insert> [opciones]");
            std::process::exit(2);
        }
    }
}
