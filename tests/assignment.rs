#[macro_use]
mod common;

#[cfg(test)]
mod assignment {
    tests! {
        associativity in assignment is OK
        "c"
        "c"
        "c"
    }

    tests! {
        grouping in assignment is ERR(65)
        "[line 2] Error at '=': Invalid assignment target."
    }

    tests! {
        to_this in assignment is ERR(65)
        "[line 3] Error at '=': Invalid assignment target."
    }

    tests! {
        undefined in assignment is ERR(70)
        "Undefined variable 'unknown'."
        "[line 1]"
    }
}
