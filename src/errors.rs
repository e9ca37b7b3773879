use diesel::result::Error as DieselError;

error_chain! {
    foreign_links {
        Var(::std::env::VarError);
        Io(::std::io::Error);
        R2D2(::r2d2::Error);
        Diesel(DieselError);
    }

    errors {
        InvalidSetting(name: &'static str, reason: String) {
            description("invalid setting")
            display("invalid setting {}: {}", name, reason)
        }
    }
}
