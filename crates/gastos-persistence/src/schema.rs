// Esquema Diesel compartido por los backends SQLite y Postgres.
// Tablas: expenses, expense_logs, expense_comments, users, user_roles,
// suppliers, people
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    expenses (id) {
        id -> Text,
        requested_by -> Text,
        supplier_id -> Text,
        amount_cents -> BigInt,
        category -> Text,
        description -> Nullable<Text>,
        status -> Text,
        supporting_doc_key -> Text,
        payment_doc_key -> Nullable<Text>,
        payment_date -> Nullable<Text>,
        paid_by -> Nullable<Text>,
        approved_by -> Nullable<Text>,
        reimbursement -> Bool,
        reimbursement_person -> Nullable<Text>,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    expense_logs (id) {
        id -> Text,
        expense_id -> Text,
        actor -> Text,
        action -> Text,
        message -> Text,
        old_status -> Nullable<Text>,
        new_status -> Nullable<Text>,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    expense_comments (id) {
        id -> Text,
        expense_id -> Text,
        author -> Text,
        body -> Text,
        created_at_ts -> BigInt,
    }
}
allow_tables_to_appear_in_same_query!(expenses, expense_logs, expense_comments);
diesel::table! {
    users (id) {
        id -> Text,
        email -> Text,
    }
}
diesel::table! {
    user_roles (id) {
        id -> Text,
        user_id -> Text,
        role -> Text,
    }
}
diesel::table! {
    suppliers (id) {
        id -> Text,
        name -> Text,
    }
}
diesel::table! {
    people (id) {
        id -> Text,
        name -> Text,
    }
}
allow_tables_to_appear_in_same_query!(users, user_roles, suppliers, people);
