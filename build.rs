fn main() {
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let mut res = winres::WindowsResource::new();
    res.set("ProductName", "DieKnow")
        .set("FileDescription", "DieKnow tray utility")
        .set("LegalCopyright", "Copyright (C) 2024 Ethan Chan");
    if let Err(e) = res.compile() {
        println!("cargo:warning=failed to embed Windows resources: {}", e);
    }
}
