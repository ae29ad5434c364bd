//! Esquema Diesel (manual). Reemplazable con `diesel print-schema`.

diesel::table! {
    attendees (attendee_id) {
        attendee_id -> Text,
        name -> Text,
        code_payload -> Nullable<Text>,
        code_image_ref -> Nullable<Text>,
        attended -> Bool,
        attended_at -> Nullable<Timestamptz>,
    }
}
