fn main() {
    // option_env!() values are cached unless cargo is told to watch them.
    println!("cargo:rerun-if-env-changed=SESSIONKIT_CLIENT_ID");
    println!("cargo:rerun-if-env-changed=SESSIONKIT_BACKEND_URL");
}
