/// Maps any error convertible into [`ErrorBag`](crate::error::ErrorBag), keeping the call site.
#[macro_export]
macro_rules! err_from {
    () => {
        |e| {
            $crate::error::MonitorError::new(
                $crate::error::ErrorBag::from(e),
                file!(),
                line!(),
            )
        }
    };
}

#[macro_export]
macro_rules! err_create {
    ($t:expr) => {
        $crate::error::MonitorError::new($crate::error::ErrorBag::from($t), file!(), line!())
    };
}

#[macro_export]
macro_rules! err_custom_create {
    ($($t:tt)*) => {
        $crate::error::MonitorError::new(
            $crate::error::ErrorBag::CustomError($crate::error::CustomError::new(&format!($($t)*))),
            file!(),
            line!(),
        )
    };
}
