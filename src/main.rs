use sheet_store::error::StoreError;

fn main() {
    if let Err(err) = sheet_store::run() {
        eprintln!("error: {err:#}");
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<StoreError>())
            .map(StoreError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
