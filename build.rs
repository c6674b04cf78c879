fn main() {
    // Version resource only makes sense in a Windows PE binary.
    if std::env::var_os("CARGO_CFG_WINDOWS").is_some() {
        let mut res = winresource::WindowsResource::new();
        res.set("ProductName", "winlayout");
        res.set("FileDescription", "Save & restore Windows desktop layouts");
        if let Err(e) = res.compile() {
            println!("cargo:warning=winresource: {e}");
        }
    }
}
