/// Declares one end-to-end test over a fixture program in `tests/target/`.
///
/// `OK` runs the file in-process with the output captured and compares what
/// `print` produced, one expected string per line. `ERR(code)` spawns the
/// real binary so the exit code and stderr can be observed.
#[macro_export]
macro_rules! tests {
    ($file:ident in $scope:ident is OK $($expected:expr)*) => {
        #[test]
        fn $file() {
            use lox_lang::Lox;

            let mut expected = vec![$($expected),*];

            let expected = match expected.len() {
                0 => "".to_string(),
                _ => {
                    // Trailing empty entry so the join ends with a newline.
                    expected.push("");
                    expected.join("\n")
                }
            };

            let mut output = Vec::new();
            let mut lox = Lox::new(&mut output);

            lox.run_file(&format!("tests/target/{}/{}.lox", stringify!($scope), stringify!($file)));

            // Release the borrow on the output buffer before reading it.
            drop(lox);
            assert_eq!(expected, std::str::from_utf8(&output).unwrap());
        }
    };

    ($file:ident in $scope:ident is ERR($code:expr) $($expected:expr)+) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;

            let output = vec![$($expected),+].join("\n");
            let file = format!("tests/target/{}/{}.lox", stringify!($scope), stringify!($file));

            Command::cargo_bin("lox").unwrap()
                .arg(file)
                .assert()
                .stderr(format!("{output}\n"))
                .code($code);
        }
    };
}
