#[macro_use]
mod common;

#[cfg(test)]
mod _for {
    tests! {
        count in for is OK
        "0"
        "1"
        "2"
    }

    tests! {
        closure_in_body in for is OK
        "4"
        "1"
        "4"
        "2"
        "4"
        "3"
    }

    tests! {
        initializer_scope in for is OK
        "0"
        "global"
    }
}
