mod friendship_tests;
