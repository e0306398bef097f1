mod permission_test;
