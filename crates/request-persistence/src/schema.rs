// Esquema Diesel compartido por SQLite y Postgres.
// Tablas: states, request_types, channels, app_users, requests, history_entries
// Los instantes se guardan como microsegundos desde epoch (`*_ts`).
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    states (code) {
        code -> Text,
        name -> Text,
        display_order -> Integer,
    }
}
diesel::table! {
    request_types (id) {
        id -> BigInt,
        code -> Text,
        name -> Text,
        description -> Nullable<Text>,
    }
}
diesel::table! {
    channels (id) {
        id -> BigInt,
        code -> Text,
        name -> Text,
    }
}
diesel::table! {
    app_users (id) {
        id -> BigInt,
        identifier -> Text,
        name -> Text,
        active -> Bool,
        role -> Nullable<Text>,
    }
}
diesel::table! {
    requests (id) {
        id -> Text,
        description -> Text,
        registered_at_ts -> BigInt,
        request_type_id -> BigInt,
        channel_id -> BigInt,
        state_code -> Text,
        priority -> Nullable<Text>,
        priority_justification -> Nullable<Text>,
        requested_by_id -> BigInt,
        assigned_to_id -> Nullable<BigInt>,
        closure_observation -> Nullable<Text>,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
        version -> BigInt,
    }
}
diesel::table! {
    history_entries (id) {
        id -> Text,
        request_id -> Text,
        cursor -> BigInt,
        occurred_at_ts -> BigInt,
        action -> Text,
        user_id -> BigInt,
        observations -> Nullable<Text>,
    }
}
diesel::joinable!(history_entries -> requests (request_id));
allow_tables_to_appear_in_same_query!(states, request_types, channels, app_users, requests, history_entries);
