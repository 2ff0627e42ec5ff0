#[macro_export]
/// Prepends the current function's name to a message and appends the source location.
/// Meant to be used with anyhow's `with_context`:
///
/// ```ignore
/// File::open(path).with_context(|| context!("Cannot open log {:?}.", path))?;
/// ```
///
/// Takes the same arguments as `format!()`.
macro_rules! context {
    ($str_literal:expr, $($arg:expr),*) => {
        format!(concat!("{}(): ", $str_literal, " file: {}, line: {}."),
                   $crate::function_name!(), $($arg),*, std::file!(), std::line!())
    };
    ($str_literal:expr) => {
        format!(concat!("{}(): ", $str_literal, " file: {}, line: {}."),
                   $crate::function_name!(), std::file!(), std::line!())
    };
}

#[macro_export]
/// Name of the enclosing function, e.g. `runescope::log_record::parse_file`.
/// Closure suffixes are dropped, so inside a closure we still get the outer function.
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        match name.find("::{{closure}}") {
            Some(pos) => &name[..pos],
            None => &name[..name.len() - 3],
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn context_names_the_enclosing_function() {
        let message = context!("Cannot open {}.", "trace.log");
        assert!(message.starts_with("runescope::utils::tests::context_names_the_enclosing_function(): "));
        assert!(message.contains("Cannot open trace.log."));
        assert!(message.contains("src/utils.rs"));
    }

    #[test]
    fn closures_report_outer_function() {
        let message = (|| context!("inside"))();
        assert!(message.starts_with("runescope::utils::tests::closures_report_outer_function(): inside"));
    }
}
