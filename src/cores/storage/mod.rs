pub mod storage_controller;
pub mod supabase;
