//! Esquema Diesel (mantenido a mano, en paridad con las migraciones).

diesel::table! {
    transactions (id) {
        id -> BigInt,
        time_stamp -> Double,
        v1 -> Double,
        v2 -> Double,
        v3 -> Double,
        v4 -> Double,
        v5 -> Double,
        v6 -> Double,
        v7 -> Double,
        v8 -> Double,
        v9 -> Double,
        v10 -> Double,
        v11 -> Double,
        v12 -> Double,
        v13 -> Double,
        v14 -> Double,
        v15 -> Double,
        v16 -> Double,
        v17 -> Double,
        v18 -> Double,
        v19 -> Double,
        v20 -> Double,
        v21 -> Double,
        v22 -> Double,
        v23 -> Double,
        v24 -> Double,
        v25 -> Double,
        v26 -> Double,
        v27 -> Double,
        v28 -> Double,
        amount -> Double,
        class -> Nullable<Integer>,
    }
}

diesel::table! {
    relay_queue (id) {
        id -> BigInt,
        time_stamp -> Double,
        v1 -> Double,
        v2 -> Double,
        v3 -> Double,
        v4 -> Double,
        v5 -> Double,
        v6 -> Double,
        v7 -> Double,
        v8 -> Double,
        v9 -> Double,
        v10 -> Double,
        v11 -> Double,
        v12 -> Double,
        v13 -> Double,
        v14 -> Double,
        v15 -> Double,
        v16 -> Double,
        v17 -> Double,
        v18 -> Double,
        v19 -> Double,
        v20 -> Double,
        v21 -> Double,
        v22 -> Double,
        v23 -> Double,
        v24 -> Double,
        v25 -> Double,
        v26 -> Double,
        v27 -> Double,
        v28 -> Double,
        amount -> Double,
        class -> Nullable<Integer>,
        attempts -> Integer,
    }
}

diesel::table! {
    dead_letter (id) {
        id -> BigInt,
        time_stamp -> Double,
        v1 -> Double,
        v2 -> Double,
        v3 -> Double,
        v4 -> Double,
        v5 -> Double,
        v6 -> Double,
        v7 -> Double,
        v8 -> Double,
        v9 -> Double,
        v10 -> Double,
        v11 -> Double,
        v12 -> Double,
        v13 -> Double,
        v14 -> Double,
        v15 -> Double,
        v16 -> Double,
        v17 -> Double,
        v18 -> Double,
        v19 -> Double,
        v20 -> Double,
        v21 -> Double,
        v22 -> Double,
        v23 -> Double,
        v24 -> Double,
        v25 -> Double,
        v26 -> Double,
        v27 -> Double,
        v28 -> Double,
        amount -> Double,
        class -> Nullable<Integer>,
        attempts -> Integer,
        last_error -> Text,
        quarantined_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(transactions, relay_queue, dead_letter,);
